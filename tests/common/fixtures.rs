//! Worker, job and response fixtures

use sensor_export::{
    ApiConfig, Config, DownloadWorker, ExportOptions, JobDescriptor, JobPolicyConfig, MemoryQueue,
};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// Configuration pointing the worker at a mock API
pub fn config_for(server: &MockServer) -> Config {
    config_for_base(&server.uri())
}

/// Configuration with an arbitrary API origin
pub fn config_for_base(base_url: &str) -> Config {
    Config {
        api: ApiConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        },
        jobs: JobPolicyConfig {
            transient_delay: Duration::from_millis(10),
            ..Default::default()
        },
    }
}

/// Worker plus the in-memory queue it submits to
pub fn worker_for(config: Config) -> (DownloadWorker, Arc<MemoryQueue>) {
    let queue = Arc::new(MemoryQueue::new());
    let worker = DownloadWorker::new(config, queue.clone()).unwrap();
    (worker, queue)
}

/// First job of an export run
pub fn first_job(base_url: &str, save_path: &Path, identifiers: &[&str]) -> JobDescriptor {
    let identifiers: Vec<String> = identifiers.iter().map(|s| s.to_string()).collect();
    let url = format!("{base_url}/api/messages?id=${{serial-number}}");
    JobDescriptor {
        title: format!("downloading url {url}"),
        identifiers: identifiers.clone(),
        original_identifiers: identifiers,
        url: url.clone(),
        original_url: url,
        save_path: save_path.to_path_buf(),
        sequence: 1,
        user_id: Some(json!(42)),
        email: Some(json!("someone@example.com")),
        options: ExportOptions {
            zip_file_name: Some(json!("export.zip")),
            utc_offset: Some(json!(-5)),
            ..Default::default()
        },
    }
}

/// API message with the given payload text
pub fn message(text: &str, date: &str) -> Value {
    json!({
        "payload": {"text": text},
        "date": date,
        "topic": "/orgs/wd/aqe/no2"
    })
}

/// Parse a JSON file
pub fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}
