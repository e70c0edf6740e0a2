//! End-to-end tests for the download worker against a mock API

mod common;

use common::*;
use sensor_export::{Error, JobKind, JobPayload, Priority, Successor};
use serde_json::json;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, id: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_identifier_writes_page_and_hands_off() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .and(query_param("id", "eggA"))
        .and(header("authorization", "api-key test-key"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"messages": [message("{'v':1}", "t1")]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");
    let (worker, queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), &out, &["eggA"]);

    let report = worker.process(&job).await.unwrap();

    assert_eq!(report.records, 1);
    assert_eq!(report.successor, Successor::Handoff);
    assert_eq!(report.page_path, Some(out.join("eggA").join("1.json")));
    assert_eq!(
        read_json(&out.join("eggA/1.json")),
        json!([{"v": 1, "timestamp": "t1", "topic": "/orgs/wd/aqe/no2"}])
    );
    assert_eq!(read_json(&out.join("status.json")), json!({"complete": false}));

    let jobs = queue.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind(), JobKind::Stitch);
    assert_eq!(jobs[0].attempts, 1);
    assert!(jobs[0].backoff.is_none());
    assert_eq!(jobs[0].priority, Priority::High);
    match &jobs[0].payload {
        JobPayload::Stitch(stitch) => {
            assert_eq!(stitch.identifiers, vec!["eggA"]);
            assert_eq!(stitch.original_identifiers, vec!["eggA"]);
            assert_eq!(stitch.save_path, out);
            assert_eq!(stitch.options, job.options);
            assert_eq!(stitch.email, job.email);
            assert_eq!(stitch.user_id, Some(json!(42)));
        }
        other => panic!("expected stitch payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_multiple_identifiers_advance_to_next() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "eggA",
        200,
        json!({"messages": [message("{'v':1}", "t1"), message("{'v':2}", "t2")]}),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA", "eggB"]);

    let report = worker.process(&job).await.unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.successor, Successor::NextIdentifier);

    let jobs = queue.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind(), JobKind::Download);
    assert_eq!(jobs[0].attempts, 10);
    match &jobs[0].payload {
        JobPayload::Download(next) => {
            assert_eq!(next.identifiers, vec!["eggB"]);
            assert_eq!(next.original_identifiers, vec!["eggA", "eggB"]);
            assert_eq!(next.sequence, 1);
            assert_eq!(next.url, job.original_url);
            assert_eq!(next.options, job.options);
        }
        other => panic!("expected download payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_next_cursor_continues_pagination() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "eggA",
        200,
        json!({
            "messages": [message("{'v':1}", "t1")],
            "next": "/api/messages?id=eggA&start-date=2017-01-02T00:00:00Z"
        }),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA=Roof", "eggB"]);

    let report = worker.process(&job).await.unwrap();
    assert_eq!(report.successor, Successor::Continued);
    assert!(temp_dir.path().join("Roof_eggA/1.json").is_file());

    let jobs = queue.jobs();
    match &jobs[0].payload {
        JobPayload::Download(next) => {
            assert_eq!(
                next.url,
                format!(
                    "{}/api/messages?id=${{serial-number}}&start-date=2017-01-02T00:00:00Z",
                    server.uri()
                )
            );
            assert_eq!(next.sequence, 2);
            assert_eq!(next.identifiers, job.identifiers);
            assert_eq!(next.original_url, job.original_url);
        }
        other => panic!("expected download payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_continued_job_writes_next_sequence() {
    let server = MockServer::start().await;
    mount_page(&server, "eggA", 200, json!({"messages": [message("{'v':9}", "t9")]})).await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, _queue) = worker_for(config_for(&server));
    let mut job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);
    job.sequence = 3;

    worker.process(&job).await.unwrap();
    assert!(temp_dir.path().join("eggA/3.json").is_file());
    assert!(!temp_dir.path().join("eggA/1.json").exists());
}

#[tokio::test]
async fn test_zero_width_cursor_ends_identifier() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "eggA",
        200,
        json!({
            "messages": [],
            "next": "/api/messages?id=eggA&start-date=2017-01-02T00:00:00Z&end-date=2017-01-02T00:00:00Z"
        }),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);

    let report = worker.process(&job).await.unwrap();
    assert_eq!(report.records, 0);
    assert_eq!(report.successor, Successor::Handoff);
    assert_eq!(read_json(&temp_dir.path().join("eggA/1.json")), json!([]));
    assert_eq!(queue.jobs()[0].kind(), JobKind::Stitch);
}

#[tokio::test]
async fn test_not_found_behaves_like_exhausted_page() {
    let server = MockServer::start().await;
    mount_page(&server, "eggA", 404, json!({"error": "no such device"})).await;
    mount_page(&server, "eggB", 200, json!({"messages": []})).await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));

    let missing = first_job(&server.uri(), temp_dir.path(), &["eggA", "eggC"]);
    let report = worker.process(&missing).await.unwrap();
    assert_eq!(report.successor, Successor::NextIdentifier);
    assert!(report.page_path.is_none());
    assert!(!temp_dir.path().join("eggA").exists());

    let exhausted = first_job(&server.uri(), temp_dir.path(), &["eggB", "eggC"]);
    let report = worker.process(&exhausted).await.unwrap();
    assert_eq!(report.successor, Successor::NextIdentifier);

    let jobs = queue.jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].kind(), jobs[1].kind());
}

#[tokio::test]
async fn test_bad_request_is_transient_without_successor() {
    let server = MockServer::start().await;
    mount_page(&server, "eggA", 400, json!({"error": "rate limited"})).await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);

    let err = worker.process(&job).await.unwrap_err();
    assert!(matches!(err, Error::TransientUpstream { status: 400, .. }));
    assert!(queue.jobs().is_empty());
    assert!(!temp_dir.path().join("eggA").exists());
}

#[tokio::test]
async fn test_server_error_is_fatal_without_successor() {
    let server = MockServer::start().await;
    mount_page(&server, "eggA", 502, json!({"error": "bad gateway"})).await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);

    match worker.process(&job).await.unwrap_err() {
        Error::UpstreamStatus { status, url, body } => {
            assert_eq!(status, 502);
            assert!(url.ends_with("id=eggA"));
            assert!(body.contains("bad gateway"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(queue.jobs().is_empty());
    assert!(!temp_dir.path().join("eggA").exists());
}

#[tokio::test]
async fn test_missing_messages_is_fatal() {
    let server = MockServer::start().await;
    mount_page(&server, "eggA", 200, json!({"next": "/api/messages?id=eggA&p=2"})).await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);

    let err = worker.process(&job).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
    assert!(queue.jobs().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_keeps_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "eggA",
        200,
        json!({"messages": [
            message("{'no2':nan, 'unit':'ppb'}", "t1"),
            message("{{{", "t2")
        ]}),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, _queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);

    worker.process(&job).await.unwrap();
    assert_eq!(
        read_json(&temp_dir.path().join("eggA/1.json")),
        json!([
            {"no2": null, "unit": "ppb", "timestamp": "t1", "topic": "/orgs/wd/aqe/no2"},
            {"timestamp": "t2", "topic": "/orgs/wd/aqe/no2"}
        ])
    );
}

#[tokio::test]
async fn test_message_with_unexpected_shape_keeps_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "eggA",
        200,
        json!({"messages": [
            message("{'v':1}", "t1"),
            {"payload": {"text": 42}, "date": "t2", "topic": "/orgs/wd/aqe/no2"}
        ]}),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);

    let report = worker.process(&job).await.unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.successor, Successor::Handoff);
    assert_eq!(
        read_json(&temp_dir.path().join("eggA/1.json")),
        json!([
            {"v": 1, "timestamp": "t1", "topic": "/orgs/wd/aqe/no2"},
            {"timestamp": "t2", "topic": "/orgs/wd/aqe/no2"}
        ])
    );
    assert_eq!(queue.jobs().len(), 1);
}

#[tokio::test]
async fn test_bad_request_waits_before_reporting() {
    let server = MockServer::start().await;
    mount_page(&server, "eggA", 400, json!({"error": "rate limited"})).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = config_for(&server);
    config.jobs.transient_delay = Duration::from_millis(300);
    let (worker, queue) = worker_for(config);
    let job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);

    // Still sleeping well before the delay has elapsed
    let early = tokio::time::timeout(Duration::from_millis(100), worker.process(&job)).await;
    assert!(early.is_err());

    let started = Instant::now();
    let err = worker.process(&job).await.unwrap_err();
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(matches!(err, Error::TransientUpstream { status: 400, .. }));
    assert!(queue.jobs().is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    // Nothing listens on port 9 of localhost
    let base = "http://127.0.0.1:9";
    let (worker, queue) = worker_for(config_for_base(base));
    let job = first_job(base, temp_dir.path(), &["eggA"]);

    let err = worker.process(&job).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(queue.jobs().is_empty());
}

#[tokio::test]
async fn test_invalid_job_rejected_before_fetch() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let mut job = first_job(&server.uri(), temp_dir.path(), &["eggA"]);
    job.identifiers.clear();

    let err = worker.process(&job).await.unwrap_err();
    assert!(matches!(err, Error::InvalidJob(_)));
    assert!(queue.jobs().is_empty());
}

#[tokio::test]
async fn test_handoff_lists_every_processed_identifier() {
    let server = MockServer::start().await;
    mount_page(&server, "eggA", 200, json!({"messages": [message("{'v':1}", "t1")]})).await;
    mount_page(&server, "eggB", 200, json!({"messages": [message("{'v':2}", "t2")]})).await;

    let temp_dir = TempDir::new().unwrap();
    let (worker, queue) = worker_for(config_for(&server));
    let first = first_job(&server.uri(), temp_dir.path(), &["eggA=North", "eggB=South"]);

    worker.process(&first).await.unwrap();
    let second = match queue.drain().remove(0).payload {
        JobPayload::Download(next) => next,
        other => panic!("expected download payload, got {other:?}"),
    };
    worker.process(&second).await.unwrap();

    match &queue.jobs()[0].payload {
        JobPayload::Stitch(stitch) => {
            assert_eq!(stitch.identifiers, vec!["North_eggA", "South_eggB"]);
            assert_eq!(stitch.original_identifiers, vec!["eggA=North", "eggB=South"]);
        }
        other => panic!("expected stitch payload, got {other:?}"),
    }
}
