//! Alias creation and atomic cutover.

use esmig::MigrateError;
use esmig::es::{AliasManager, CreateAliasOutcome, SwapOutcome};
use httpmock::prelude::*;
use serde_json::json;

use crate::common::{acknowledged, connect, mock_exists, mock_resolve};

#[test]
fn create_alias_adds_when_absent() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", false);
    let add = server.mock(|when, then| {
        when.method(POST).path("/_aliases").json_body(json!({
            "actions": [ { "add": { "index": "candidates_v2", "alias": "candidates" } } ]
        }));
        then.status(200).json_body(acknowledged());
    });

    let outcome = AliasManager::new(&conn)
        .create_alias("candidates_v2", "candidates")
        .unwrap();

    assert_eq!(outcome, CreateAliasOutcome::Created);
    add.assert_calls(1);
}

#[test]
fn create_alias_leaves_existing_alias_alone() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", true);
    let update = server.mock(|when, then| {
        when.method(POST).path("/_aliases");
        then.status(200).json_body(acknowledged());
    });

    let outcome = AliasManager::new(&conn)
        .create_alias("candidates_v3", "candidates")
        .unwrap();

    assert_eq!(outcome, CreateAliasOutcome::AlreadyExists);
    update.assert_calls(0);
}

#[test]
fn swapping_missing_alias_never_creates_it() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", false);
    let update = server.mock(|when, then| {
        when.method(POST).path("/_aliases");
        then.status(200).json_body(acknowledged());
    });

    let outcome = AliasManager::new(&conn)
        .swap_alias("candidates_v2", "candidates_v3", "candidates")
        .unwrap();

    assert_eq!(outcome, SwapOutcome::NotFound);
    update.assert_calls(0);
}

#[test]
fn swap_sends_remove_and_add_in_one_request() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", true);
    mock_resolve(&server, "candidates", &["candidates_v2"]);
    let swap = server.mock(|when, then| {
        when.method(POST).path("/_aliases").json_body(json!({
            "actions": [
                { "remove": { "index": "candidates_v2", "alias": "candidates", "must_exist": true } },
                { "add": { "index": "candidates_v3", "alias": "candidates" } }
            ]
        }));
        then.status(200).json_body(acknowledged());
    });

    let outcome = AliasManager::new(&conn)
        .swap_alias("candidates_v2", "candidates_v3", "candidates")
        .unwrap();

    assert_eq!(outcome, SwapOutcome::Swapped);
    swap.assert_calls(1);
}

#[test]
fn swap_to_current_target_is_a_no_op() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", true);
    mock_resolve(&server, "candidates", &["candidates_v3"]);
    let update = server.mock(|when, then| {
        when.method(POST).path("/_aliases");
        then.status(200).json_body(acknowledged());
    });

    let outcome = AliasManager::new(&conn)
        .swap_alias("candidates_v2", "candidates_v3", "candidates")
        .unwrap();

    assert_eq!(outcome, SwapOutcome::AlreadyCurrent);
    update.assert_calls(0);
}

#[test]
fn alias_pointing_elsewhere_is_a_conflict() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", true);
    mock_resolve(&server, "candidates", &["candidates_v1"]);
    let update = server.mock(|when, then| {
        when.method(POST).path("/_aliases");
        then.status(200).json_body(acknowledged());
    });

    let err = AliasManager::new(&conn)
        .swap_alias("candidates_v2", "candidates_v3", "candidates")
        .unwrap_err();

    assert!(matches!(err, MigrateError::AliasConflict { .. }), "{err:?}");
    assert_eq!(err.code(), "alias_conflict");
    update.assert_calls(0);
}

#[test]
fn alias_on_several_indices_is_a_conflict() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", true);
    mock_resolve(&server, "candidates", &["candidates_v2", "candidates_v3"]);

    let err = AliasManager::new(&conn)
        .swap_alias("candidates_v2", "candidates_v3", "candidates")
        .unwrap_err();

    assert!(matches!(err, MigrateError::AliasConflict { .. }), "{err:?}");
}

#[test]
fn missing_target_index_is_an_engine_error() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", true);
    mock_resolve(&server, "candidates", &["candidates_v2"]);
    let body = r#"{"error":{"type":"index_not_found_exception","reason":"no such index [candidates_v3]"},"status":404}"#;
    server.mock(|when, then| {
        when.method(POST).path("/_aliases");
        then.status(404)
            .header("content-type", "application/json")
            .body(body);
    });

    let err = AliasManager::new(&conn)
        .swap_alias("candidates_v2", "candidates_v3", "candidates")
        .unwrap_err();

    assert!(
        matches!(&err, MigrateError::Engine { status: 404, error_type, .. } if error_type == "index_not_found_exception"),
        "{err:?}"
    );
    assert_eq!(err.code(), "engine_error");
    assert_eq!(err.engine_body(), Some(body));
}

#[test]
fn creating_alias_on_missing_index_is_an_engine_error() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", false);
    server.mock(|when, then| {
        when.method(POST).path("/_aliases");
        then.status(404).json_body(json!({
            "error": {
                "type": "index_not_found_exception",
                "reason": "no such index [candidates_v9]"
            },
            "status": 404
        }));
    });

    let err = AliasManager::new(&conn)
        .create_alias("candidates_v9", "candidates")
        .unwrap_err();

    assert_eq!(err.code(), "engine_error");
}

#[test]
fn alias_moved_during_swap_is_a_conflict() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/_alias/candidates", true);
    mock_resolve(&server, "candidates", &["candidates_v2"]);
    let body = r#"{"error":{"type":"aliases_not_found_exception","reason":"aliases [candidates] missing"},"status":404}"#;
    server.mock(|when, then| {
        when.method(POST).path("/_aliases");
        then.status(404)
            .header("content-type", "application/json")
            .body(body);
    });

    let err = AliasManager::new(&conn)
        .swap_alias("candidates_v2", "candidates_v3", "candidates")
        .unwrap_err();

    match &err {
        MigrateError::AliasConflict { alias, message, .. } => {
            assert_eq!(alias, "candidates");
            assert!(message.starts_with("aliases_not_found_exception"), "{message}");
        }
        other => panic!("expected alias conflict, got {other:?}"),
    }
    assert_eq!(err.engine_body(), Some(body));
}

#[test]
fn resolving_missing_alias_is_empty() {
    let server = MockServer::start();
    let conn = connect(&server);
    server.mock(|when, then| {
        when.method(GET).path("/_alias/candidates");
        then.status(404).json_body(json!({
            "error": "alias [candidates] missing",
            "status": 404
        }));
    });

    assert!(
        AliasManager::new(&conn)
            .resolve_alias("candidates")
            .unwrap()
            .is_empty()
    );
}
