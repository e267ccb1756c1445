//! Common test utilities for driving the API in-process.
//!
//! The fixture wires the real router, store, tracker and registry to
//! mock capabilities and a mock pool engine, so conversion flows can be
//! tested end to end without LibreOffice or any other binary.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use docforge_core::artifact::{ArtifactConfig, ArtifactStore};
use docforge_core::capability::{Capability, CapabilityId};
use docforge_core::format::{FormatRegistry, RegistryConfig};
use docforge_core::job::JobTracker;
use docforge_core::pool::{PoolConfig, ProcessPoolManager};
use docforge_core::router::{FallbackRouter, RouterConfig};
use docforge_core::testing::{MockCapability, MockEngine};
use docforge_core::Config;

use docforge_server::api::create_router;
use docforge_server::state::AppState;

/// Test fixture with an in-process server backed by mock capabilities.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The mock capabilities, by id, for configuring behavior
    pub capabilities: HashMap<CapabilityId, Arc<MockCapability>>,
    /// The job tracker, for direct state inspection
    pub tracker: Arc<JobTracker>,
    /// The artifact store
    pub store: Arc<ArtifactStore>,
    /// Storage root; dropped with the fixture
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture whose mock capabilities all succeed and write
    /// `b"converted"` to their output.
    pub async fn new() -> Self {
        Self::with_capabilities(|id| {
            Arc::new(MockCapability::new(id).with_output(b"converted"))
        })
        .await
    }

    /// Create a fixture with custom mock capabilities.
    pub async fn with_capabilities<F>(make: F) -> Self
    where
        F: Fn(CapabilityId) -> Arc<MockCapability>,
    {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.storage.root_dir = temp_dir.path().to_path_buf();
        config.pool.size = 1;
        config.pool.respawn_backoff_ms = 10;

        let store = Arc::new(
            ArtifactStore::new(config.storage.clone()).expect("Failed to create artifact store"),
        );

        let pool = Arc::new(ProcessPoolManager::new(
            PoolConfig {
                size: 1,
                respawn_backoff_ms: 10,
                ..Default::default()
            },
            Arc::new(MockEngine::new()),
        ));
        pool.start().await;

        let capabilities: HashMap<CapabilityId, Arc<MockCapability>> = [
            CapabilityId::OfficeEngine,
            CapabilityId::PdfConvert,
            CapabilityId::PdfRender,
            CapabilityId::ImageMagick,
            CapabilityId::Pandoc,
            CapabilityId::DocumentRender,
        ]
        .into_iter()
        .map(|id| (id, make(id)))
        .collect();

        let registry_input: HashMap<CapabilityId, Arc<dyn Capability>> = capabilities
            .iter()
            .map(|(id, c)| (*id, Arc::clone(c) as Arc<dyn Capability>))
            .collect();
        let registry = Arc::new(
            FormatRegistry::new(&RegistryConfig::default(), registry_input)
                .expect("Failed to build format registry"),
        );

        let tracker = Arc::new(JobTracker::new());
        let router_core = Arc::new(FallbackRouter::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&pool),
            Arc::clone(&tracker),
            RouterConfig::default(),
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store),
            pool,
            registry,
            Arc::clone(&tracker),
            router_core,
        ));

        let router = create_router(state);

        Self {
            router,
            capabilities,
            tracker,
            store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Request::builder().method("GET").uri(path), Body::empty())
            .await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(
            Request::builder().method("DELETE").uri(path),
            Body::empty(),
        )
        .await
    }

    /// Send a POST request with an empty body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request(Request::builder().method("POST").uri(path), Body::empty())
            .await
    }

    /// Send a multipart conversion request.
    ///
    /// `fields` are (name, value) text fields added after the file part.
    pub async fn post_convert(
        &self,
        path: &str,
        filename: &str,
        bytes: &[u8],
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let boundary = "docforge-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        self.request(
            Request::builder().method("POST").uri(path).header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            ),
            Body::from(body),
        )
        .await
    }

    /// Download an artifact, returning the raw bytes and content type.
    pub async fn download(&self, path: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();
        (status, content_type, bytes)
    }

    /// Poll a job until it reaches a terminal state.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let response = self.get(&format!("/api/v1/jobs/{}", job_id)).await;
            assert_eq!(response.status, StatusCode::OK);
            let state_type = response.body["state"]["type"].as_str().unwrap().to_string();
            if matches!(state_type.as_str(), "succeeded" | "failed" | "cancelled") {
                return response.body;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "job {} never reached a terminal state",
                job_id
            );
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    }

    async fn request(
        &self,
        builder: axum::http::request::Builder,
        body: Body,
    ) -> TestResponse {
        let request = builder.body(body).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
