//! Model registry client.
//!
//! Artifacts are addressed as `name:version` and served at
//! `GET {registry_url}/models/{name}/{version}` as a JSON `TreeEnsemble`.
//! Loading happens once at session startup and is a hard dependency: any
//! failure here is fatal, with no retry policy.

use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::domain::AppConfig;
use crate::error::AppError;
use crate::model::ensemble::TreeEnsemble;

pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::startup(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.registry_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch and validate the pinned model artifact.
    pub fn fetch_model(&self, name: &str, version: &str) -> Result<TreeEnsemble, AppError> {
        let url = format!("{}/models/{name}/{version}", self.base_url);
        info!(model = %name, version = %version, url = %url, "loading model artifact");

        let resp = self.client.get(&url).send().map_err(|e| {
            AppError::startup(format!(
                "Model registry unreachable while loading '{name}:{version}': {e}"
            ))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AppError::startup(format!(
                "Model registry returned {} for '{name}:{version}': {body}",
                status.as_u16()
            )));
        }

        let ensemble: TreeEnsemble = resp.json().map_err(|e| {
            AppError::startup(format!(
                "Invalid model artifact for '{name}:{version}': {e}"
            ))
        })?;

        ensemble.validate().map_err(|msg| {
            AppError::startup(format!(
                "Model artifact '{name}:{version}' failed validation: {msg}"
            ))
        })?;

        if ensemble.name != name || ensemble.version != version {
            warn!(
                artifact = %format!("{}:{}", ensemble.name, ensemble.version),
                requested = %format!("{name}:{version}"),
                "artifact metadata does not match the requested address"
            );
        }

        info!(
            trees = ensemble.trees.len(),
            features = ensemble.n_features(),
            "model artifact loaded"
        );
        Ok(ensemble)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::domain::ReferenceSource;

    fn test_config(registry_url: String) -> AppConfig {
        AppConfig {
            service_url: "http://localhost:9/".to_string(),
            registry_url,
            model_name: "m".to_string(),
            model_version: "1".to_string(),
            reference: ReferenceSource::None,
            timeout: Duration::from_secs(2),
            cache_ttl: None,
            cache_capacity: 16,
            top_n: 15,
            background_rows: 0,
            sample_seed: 42,
            export_importance: None,
            export_explanation: None,
            debug_bundle: false,
        }
    }

    fn spawn_stub(status_line: &str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn fetches_and_validates_artifact() {
        let body = r#"{
            "name": "m", "version": "1",
            "feature_names": ["f0"],
            "base_score": 0.0,
            "trees": [{"nodes": [
                {"feature": 0, "threshold": 0.5, "left": 1, "right": 2, "value": 0.0},
                {"value": -1.0}, {"value": 1.0}
            ]}]
        }"#;
        let base = spawn_stub("200 OK", body.to_string());
        let registry = RegistryClient::new(&test_config(base)).unwrap();
        let model = registry.fetch_model("m", "1").unwrap();
        assert_eq!(model.trees.len(), 1);
    }

    #[test]
    fn missing_artifact_is_a_startup_failure() {
        let base = spawn_stub("404 Not Found", "model version not found".to_string());
        let registry = RegistryClient::new(&test_config(base)).unwrap();
        let err = registry.fetch_model("m", "99").unwrap_err();
        assert_eq!(err.exit_code(), 3);
        let msg = err.to_string();
        assert!(msg.contains("404"), "missing status in: {msg}");
        assert!(msg.contains("model version not found"), "missing body in: {msg}");
    }

    #[test]
    fn structurally_broken_artifact_is_rejected() {
        let body = r#"{
            "name": "m", "version": "1",
            "feature_names": ["f0"],
            "base_score": 0.0,
            "trees": [{"nodes": [
                {"feature": 4, "threshold": 0.5, "left": 1, "right": 2, "value": 0.0},
                {"value": -1.0}, {"value": 1.0}
            ]}]
        }"#;
        let base = spawn_stub("200 OK", body.to_string());
        let registry = RegistryClient::new(&test_config(base)).unwrap();
        let err = registry.fetch_model("m", "1").unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("failed validation"));
    }

    #[test]
    fn unreachable_registry_is_fatal() {
        // Nothing listens on port 9 (discard-like); connection is refused.
        let registry = RegistryClient::new(&test_config("http://127.0.0.1:9".to_string())).unwrap();
        let err = registry.fetch_model("m", "1").unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("unreachable"));
    }
}
