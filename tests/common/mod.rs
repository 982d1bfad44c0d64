//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which points the upstream endpoints and the CDN at
//! a [`MockServer`], keeps the cache in a temporary directory and swaps the
//! ffmpeg remuxer for [`ConcatRemuxer`]. The [`TestHarness::with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;

use bilirelay::cache::CacheStore;
use bilirelay::config::Config;
use bilirelay::download::HttpDownloader;
use bilirelay::fetch::Fetcher;
use bilirelay::pipeline::MediaPipeline;
use bilirelay::remux::Remuxer;
use bilirelay::server::{create_router, AppContext};
use bilirelay::upstream::UpstreamApi;
use bilirelay_av::RemuxInput;
use bilirelay_common::OutputFormat;

/// Remuxer that writes the inputs' bytes back to back, in order.
#[derive(Default)]
pub struct ConcatRemuxer {
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<Vec<RemuxInput>>>,
}

impl ConcatRemuxer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Remuxer for ConcatRemuxer {
    async fn combine(
        &self,
        inputs: &[RemuxInput],
        output: &Path,
        _format: OutputFormat,
    ) -> bilirelay::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(inputs.to_vec());

        let mut muxed = Vec::new();
        for input in inputs {
            muxed.extend(tokio::fs::read(&input.path).await?);
        }
        tokio::fs::write(output, muxed).await?;
        Ok(())
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub mock: MockServer,
    pub remuxer: Arc<ConcatRemuxer>,
    pub cache_dir: TempDir,
}

impl TestHarness {
    /// Create a new harness whose upstream is a fresh mock server.
    pub async fn new() -> Self {
        let mock = MockServer::start().await;
        let cache_dir = tempfile::tempdir().expect("failed to create cache dir");

        let mut config = Config::default();
        config.cache.directory = cache_dir.path().to_path_buf();
        config.upstream.generate_url = format!("{}/x/passport-login/web/qrcode/generate", mock.uri());
        config.upstream.poll_url = format!("{}/x/passport-login/web/qrcode/poll", mock.uri());
        config.upstream.view_url = format!("{}/x/web-interface/view", mock.uri());
        config.upstream.playurl_url = format!("{}/x/player/playurl", mock.uri());
        config.download.jitter_ms = 0;
        config.download.chunk_size = 4096;

        let fetcher = Fetcher::default();
        let upstream = UpstreamApi::new(fetcher.clone(), config.upstream.clone());
        let cache = CacheStore::open(cache_dir.path()).expect("failed to open cache");
        let downloader = HttpDownloader::new(fetcher, &config.download);
        let remuxer = Arc::new(ConcatRemuxer::default());
        let pipeline = MediaPipeline::new(cache, Arc::new(downloader), remuxer.clone());

        let ctx = AppContext {
            config: Arc::new(config),
            upstream: Arc::new(upstream),
            pipeline: Arc::new(pipeline),
        };

        Self {
            ctx,
            mock,
            remuxer,
            cache_dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new().await;
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Absolute URL of `path` on the mock server.
    pub fn cdn_url(&self, path: &str) -> String {
        format!("{}{}", self.mock.uri(), path)
    }

    /// Send a GET through the router without binding a socket.
    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        let app = create_router(self.ctx.clone());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    /// Send a GET and parse the body as JSON.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = self.get(uri).await;
        let json = serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!("body is not JSON ({}): {}", e, String::from_utf8_lossy(&body))
        });
        (status, json)
    }
}

/// Percent-encode a query value.
pub fn q(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
