//! Index lifecycle against the mock engine.

use esmig::MigrateError;
use esmig::es::{DeleteOutcome, EnsureOutcome, IndexManager, Mapping};
use httpmock::Method::HEAD;
use httpmock::prelude::*;
use serde_json::json;

use crate::common::{acknowledged, connect, mock_count, mock_exists};

fn candidate_mapping() -> Mapping {
    Mapping::from_value(json!({
        "properties": {
            "firstName": { "type": "keyword" },
            "lastName": { "type": "keyword" },
            "fullName": { "type": "text" }
        }
    }))
    .unwrap()
}

#[test]
fn ensure_index_creates_once_then_reports_existing() {
    let server = MockServer::start();
    let conn = connect(&server);
    let indices = IndexManager::new(&conn);

    let mut missing = mock_exists(&server, "/candidates_v3", false);
    let create = server.mock(|when, then| {
        when.method(PUT).path("/candidates_v3").json_body(json!({
            "mappings": {
                "properties": {
                    "firstName": { "type": "keyword" },
                    "lastName": { "type": "keyword" },
                    "fullName": { "type": "text" }
                }
            }
        }));
        then.status(200).json_body(json!({
            "acknowledged": true,
            "shards_acknowledged": true,
            "index": "candidates_v3"
        }));
    });

    assert_eq!(
        indices.ensure_index("candidates_v3", &candidate_mapping()).unwrap(),
        EnsureOutcome::Created
    );

    missing.delete();
    mock_exists(&server, "/candidates_v3", true);

    assert_eq!(
        indices.ensure_index("candidates_v3", &candidate_mapping()).unwrap(),
        EnsureOutcome::AlreadyExists
    );
    create.assert_calls(1);
}

#[test]
fn ensure_index_treats_lost_creation_race_as_existing() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/candidates_v3", false);
    server.mock(|when, then| {
        when.method(PUT).path("/candidates_v3");
        then.status(400).json_body(json!({
            "error": {
                "type": "resource_already_exists_exception",
                "reason": "index [candidates_v3/abc] already exists"
            },
            "status": 400
        }));
    });

    let outcome = IndexManager::new(&conn)
        .ensure_index("candidates_v3", &Mapping::empty())
        .unwrap();

    assert_eq!(outcome, EnsureOutcome::AlreadyExists);
}

#[test]
fn rejected_mapping_surfaces_engine_error_with_body() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/candidates_v3", false);
    let body = r#"{"error":{"type":"mapper_parsing_exception","reason":"No handler for type [strng] declared on field [fullName]"},"status":400}"#;
    server.mock(|when, then| {
        when.method(PUT).path("/candidates_v3");
        then.status(400)
            .header("content-type", "application/json")
            .body(body);
    });

    let err = IndexManager::new(&conn)
        .ensure_index("candidates_v3", &candidate_mapping())
        .unwrap_err();

    match &err {
        MigrateError::Engine {
            status,
            error_type,
            reason,
            ..
        } => {
            assert_eq!(*status, 400);
            assert_eq!(error_type, "mapper_parsing_exception");
            assert!(reason.contains("strng"));
        }
        other => panic!("expected engine error, got {other:?}"),
    }
    assert_eq!(err.engine_body(), Some(body));
}

#[test]
fn deleting_missing_index_sends_no_delete() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/candidates_v1", false);
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/candidates_v1");
        then.status(200).json_body(acknowledged());
    });

    let outcome = IndexManager::new(&conn).delete_index("candidates_v1").unwrap();

    assert_eq!(outcome, DeleteOutcome::NotFound);
    delete.assert_calls(0);
}

#[test]
fn deleting_existing_index() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/candidates_v2", true);
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/candidates_v2");
        then.status(200).json_body(acknowledged());
    });

    let outcome = IndexManager::new(&conn).delete_index("candidates_v2").unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted);
    delete.assert_calls(1);
}

#[test]
fn delete_failure_is_an_engine_error() {
    let server = MockServer::start();
    let conn = connect(&server);
    mock_exists(&server, "/candidates_v2", true);
    server.mock(|when, then| {
        when.method(DELETE).path("/candidates_v2");
        then.status(403).json_body(json!({
            "error": {
                "type": "security_exception",
                "reason": "action [indices:admin/delete] is unauthorized"
            },
            "status": 403
        }));
    });

    let err = IndexManager::new(&conn).delete_index("candidates_v2").unwrap_err();

    assert!(
        matches!(&err, MigrateError::Engine { status: 403, error_type, .. } if error_type == "security_exception"),
        "{err:?}"
    );
}

#[test]
fn existence_check_propagates_unexpected_status() {
    let server = MockServer::start();
    let conn = connect(&server);
    server.mock(|when, then| {
        when.method(HEAD).path("/candidates_v2");
        then.status(500);
    });

    let err = IndexManager::new(&conn).index_exists("candidates_v2").unwrap_err();

    assert!(matches!(err, MigrateError::Engine { status: 500, .. }), "{err:?}");
}

#[test]
fn document_count_reads_count_field() {
    let server = MockServer::start();
    let conn = connect(&server);
    let count = mock_count(&server, "candidates_v2", 1000);

    assert_eq!(
        IndexManager::new(&conn).document_count("candidates_v2").unwrap(),
        1000
    );
    count.assert_calls(1);
}
