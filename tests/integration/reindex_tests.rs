//! Reindex requests and how engine-reported failures surface.

use esmig::MigrateError;
use esmig::es::{ReindexJob, Reindexer, Transform};
use httpmock::prelude::*;
use serde_json::json;

use crate::common::{connect, reindex_ok};

#[test]
fn reindex_blocks_until_complete_and_reports_counts() {
    let server = MockServer::start();
    let conn = connect(&server);
    let reindex = server.mock(|when, then| {
        when.method(POST)
            .path("/_reindex")
            .query_param("wait_for_completion", "true")
            .query_param("refresh", "true")
            .json_body(json!({
                "source": { "index": "candidates_v2" },
                "dest": { "index": "candidates_v3" }
            }));
        then.status(200).json_body(reindex_ok(1000));
    });

    let report = Reindexer::new(&conn)
        .reindex(&ReindexJob::new("candidates_v2", "candidates_v3"))
        .unwrap();

    reindex.assert_calls(1);
    assert_eq!(report.total, 1000);
    assert_eq!(report.created, 1000);
    assert_eq!(report.documents_copied(), 1000);
    assert_eq!(report.took_ms, 42);
}

#[test]
fn full_name_transform_is_sent_as_script() {
    let server = MockServer::start();
    let conn = connect(&server);
    let job = ReindexJob::new("candidates_v2", "candidates_v3")
        .with_transform(Some(Transform::full_name()));
    let expected = job.body();
    let reindex = server.mock(move |when, then| {
        when.method(POST).path("/_reindex").json_body(expected);
        then.status(200).json_body(reindex_ok(3));
    });

    let report = Reindexer::new(&conn).reindex(&job).unwrap();

    reindex.assert_calls(1);
    assert_eq!(report.created, 3);
}

#[test]
fn document_failures_become_reindex_error_with_sample_ids() {
    let server = MockServer::start();
    let conn = connect(&server);
    let failures: Vec<_> = (0..12)
        .map(|i| {
            json!({
                "index": "candidates_v3",
                "id": format!("cand-{i}"),
                "cause": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field [fullName]"
                },
                "status": 400
            })
        })
        .collect();
    let mut body = reindex_ok(988);
    body["failures"] = json!(failures);
    server.mock(move |when, then| {
        when.method(POST).path("/_reindex");
        then.status(200).json_body(body);
    });

    let err = Reindexer::new(&conn)
        .reindex(&ReindexJob::new("candidates_v2", "candidates_v3"))
        .unwrap_err();

    match &err {
        MigrateError::Reindex {
            failures,
            sample_ids,
            timed_out,
            body,
            ..
        } => {
            assert_eq!(*failures, 12);
            assert_eq!(sample_ids.len(), 10);
            assert_eq!(sample_ids[0], "cand-0");
            assert!(!timed_out);
            assert!(body.contains("mapper_parsing_exception"));
        }
        other => panic!("expected reindex error, got {other:?}"),
    }
    assert_eq!(err.code(), "reindex_error");
}

#[test]
fn version_conflicts_fail_the_reindex() {
    let server = MockServer::start();
    let conn = connect(&server);
    let mut body = reindex_ok(990);
    body["version_conflicts"] = json!(10);
    server.mock(move |when, then| {
        when.method(POST).path("/_reindex");
        then.status(200).json_body(body);
    });

    let err = Reindexer::new(&conn)
        .reindex(&ReindexJob::new("candidates_v2", "candidates_v3"))
        .unwrap_err();

    assert!(
        matches!(err, MigrateError::Reindex { version_conflicts: 10, failures: 0, .. }),
        "{err:?}"
    );
}

#[test]
fn engine_timeout_fails_the_reindex() {
    let server = MockServer::start();
    let conn = connect(&server);
    let mut body = reindex_ok(500);
    body["timed_out"] = json!(true);
    server.mock(move |when, then| {
        when.method(POST).path("/_reindex");
        then.status(200).json_body(body);
    });

    let err = Reindexer::new(&conn)
        .reindex(&ReindexJob::new("candidates_v2", "candidates_v3"))
        .unwrap_err();

    assert!(matches!(err, MigrateError::Reindex { timed_out: true, .. }), "{err:?}");
}

#[test]
fn missing_source_index_is_an_engine_error() {
    let server = MockServer::start();
    let conn = connect(&server);
    server.mock(|when, then| {
        when.method(POST).path("/_reindex");
        then.status(404).json_body(json!({
            "error": {
                "type": "index_not_found_exception",
                "reason": "no such index [candidates_v2]"
            },
            "status": 404
        }));
    });

    let err = Reindexer::new(&conn)
        .reindex(&ReindexJob::new("candidates_v2", "candidates_v3"))
        .unwrap_err();

    assert!(
        matches!(&err, MigrateError::Engine { status: 404, error_type, .. } if error_type == "index_not_found_exception"),
        "{err:?}"
    );
}

#[test]
fn preview_applies_transform_to_one_document() {
    let server = MockServer::start();
    let conn = connect(&server);
    server.mock(|when, then| {
        when.method(GET).path("/candidates_v2/_doc/cand-1");
        then.status(200).json_body(json!({
            "_index": "candidates_v2",
            "_id": "cand-1",
            "found": true,
            "_source": { "firstName": "Ada", "lastName": "Lovelace" }
        }));
    });

    let preview = Reindexer::new(&conn)
        .preview("candidates_v2", "cand-1", &Transform::full_name())
        .unwrap();

    assert_eq!(preview.id, "cand-1");
    assert_eq!(preview.before, json!({ "firstName": "Ada", "lastName": "Lovelace" }));
    assert_eq!(preview.after["fullName"], json!("Ada Lovelace"));
}

#[test]
fn preview_of_missing_document_is_a_validation_error() {
    let server = MockServer::start();
    let conn = connect(&server);
    server.mock(|when, then| {
        when.method(GET).path("/candidates_v2/_doc/nope");
        then.status(404).json_body(json!({ "_index": "candidates_v2", "_id": "nope", "found": false }));
    });

    let err = Reindexer::new(&conn)
        .preview("candidates_v2", "nope", &Transform::full_name())
        .unwrap_err();

    assert!(matches!(err, MigrateError::ValidationFailed(_)), "{err:?}");
}

fn mock_failed_reindex(server: &MockServer, status: u16, body: serde_json::Value) {
    server.mock(move |when, then| {
        when.method(POST).path("/_reindex");
        then.status(status).json_body(body);
    });
}

#[test]
fn mapping_failures_with_400_status_keep_failure_details() {
    let server = MockServer::start();
    let conn = connect(&server);
    let mut body = reindex_ok(999);
    body["failures"] = json!([{
        "index": "candidates_v3",
        "id": "cand-1",
        "cause": { "type": "mapper_parsing_exception", "reason": "failed to parse field [age]" },
        "status": 400
    }]);
    mock_failed_reindex(&server, 400, body);

    let err = Reindexer::new(&conn)
        .reindex(&ReindexJob::new("candidates_v2", "candidates_v3"))
        .unwrap_err();

    match &err {
        MigrateError::Reindex {
            failures,
            sample_ids,
            ..
        } => {
            assert_eq!(*failures, 1);
            assert_eq!(sample_ids, &vec!["cand-1".to_string()]);
        }
        other => panic!("expected reindex error, got {other:?}"),
    }
    assert_eq!(err.code(), "reindex_error");
}

#[test]
fn version_conflicts_with_409_status_are_a_reindex_error() {
    let server = MockServer::start();
    let conn = connect(&server);
    let mut body = reindex_ok(999);
    body["version_conflicts"] = json!(1);
    body["failures"] = json!([{
        "index": "candidates_v3",
        "id": "cand-7",
        "cause": { "type": "version_conflict_engine_exception", "reason": "version conflict" },
        "status": 409
    }]);
    mock_failed_reindex(&server, 409, body);

    let err = Reindexer::new(&conn)
        .reindex(&ReindexJob::new("candidates_v2", "candidates_v3"))
        .unwrap_err();

    assert!(
        matches!(&err, MigrateError::Reindex { version_conflicts: 1, failures: 1, sample_ids, .. } if sample_ids[0] == "cand-7"),
        "{err:?}"
    );
}

#[test]
fn timeout_with_408_status_is_a_reindex_error() {
    let server = MockServer::start();
    let conn = connect(&server);
    let mut body = reindex_ok(400);
    body["timed_out"] = json!(true);
    mock_failed_reindex(&server, 408, body);

    let err = Reindexer::new(&conn)
        .reindex(&ReindexJob::new("candidates_v2", "candidates_v3"))
        .unwrap_err();

    assert!(matches!(err, MigrateError::Reindex { timed_out: true, .. }), "{err:?}");
}
