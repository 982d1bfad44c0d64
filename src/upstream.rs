//! Relayed bilibili web APIs.
//!
//! Each call is a stateless GET whose JSON `data` field is handed back to the
//! browser unchanged.

use crate::config::UpstreamConfig;
use crate::fetch::{Fetcher, HeaderBundle};
use crate::Result;
use serde_json::Value;

/// Quality number requested from the play-URL API (highest available).
const PLAYURL_QN: u32 = 127;
/// Feature bitmask: DASH, HDR, 4K, Dolby audio/vision, 8K, AV1.
const PLAYURL_FNVAL: u32 = 4048;
const PLAYURL_FNVER: u32 = 0;
const PLAYURL_FOURK: u32 = 1;

/// Client for the four relayed endpoints.
#[derive(Clone)]
pub struct UpstreamApi {
    fetcher: Fetcher,
    config: UpstreamConfig,
}

impl UpstreamApi {
    pub fn new(fetcher: Fetcher, config: UpstreamConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Request a new login QR code.
    pub async fn generate(&self, headers: &HeaderBundle) -> Result<Value> {
        self.get(&self.config.generate_url, &[], headers).await
    }

    /// Poll the scan state of a login QR code.
    pub async fn poll(&self, qrcode_key: &str, headers: &HeaderBundle) -> Result<Value> {
        self.get(&self.config.poll_url, &[("qrcode_key", qrcode_key)], headers)
            .await
    }

    /// Fetch video metadata for a BV id.
    pub async fn view(&self, bvid: &str, headers: &HeaderBundle) -> Result<Value> {
        self.get(&self.config.view_url, &[("bvid", bvid)], headers)
            .await
    }

    /// Resolve DASH stream URLs for one part (`cid`) of a video.
    pub async fn playurl(&self, bvid: &str, cid: &str, headers: &HeaderBundle) -> Result<Value> {
        let qn = PLAYURL_QN.to_string();
        let fnval = PLAYURL_FNVAL.to_string();
        let fnver = PLAYURL_FNVER.to_string();
        let fourk = PLAYURL_FOURK.to_string();
        let params = [
            ("bvid", bvid),
            ("cid", cid),
            ("qn", qn.as_str()),
            ("fnval", fnval.as_str()),
            ("fnver", fnver.as_str()),
            ("fourk", fourk.as_str()),
        ];
        self.get(&self.config.playurl_url, &params, headers).await
    }

    async fn get(&self, url: &str, params: &[(&str, &str)], headers: &HeaderBundle) -> Result<Value> {
        tracing::debug!("Relaying GET {} with {} param(s)", url, params.len());
        self.fetcher
            .get_data(url, params, headers, self.config.request_timeout())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> UpstreamApi {
        let config = UpstreamConfig {
            generate_url: format!("{}/qrcode/generate", server.uri()),
            poll_url: format!("{}/qrcode/poll", server.uri()),
            view_url: format!("{}/view", server.uri()),
            playurl_url: format!("{}/playurl", server.uri()),
            ..UpstreamConfig::default()
        };
        UpstreamApi::new(Fetcher::default(), config)
    }

    fn bundle(api: &UpstreamApi) -> HeaderBundle {
        HeaderBundle::new(Some("SESSDATA=abc"), Some("TestAgent/1.0"), api.config())
    }

    #[tokio::test]
    async fn test_playurl_sends_fixed_params_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/playurl"))
            .and(query_param("bvid", "BV1xx411c7mD"))
            .and(query_param("cid", "12345"))
            .and(query_param("qn", "127"))
            .and(query_param("fnval", "4048"))
            .and(query_param("fnver", "0"))
            .and(query_param("fourk", "1"))
            .and(header("cookie", "SESSDATA=abc"))
            .and(header("referer", "https://www.bilibili.com/"))
            .and(header("user-agent", "TestAgent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "data": { "dash": { "audio": [], "video": [] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let data = api
            .playurl("BV1xx411c7mD", "12345", &bundle(&api))
            .await
            .unwrap();
        assert!(data["dash"]["audio"].is_array());
    }

    #[tokio::test]
    async fn test_missing_data_is_empty_object() {
        let server = MockServer::start().await;
        Mock::given(path("/qrcode/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "code": -101 })),
            )
            .mount(&server)
            .await;

        let api = api_for(&server);
        let data = api.generate(&bundle(&api)).await.unwrap();
        assert_eq!(data, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_http_error_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(path("/view"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.view("BV1xx411c7mD", &bundle(&api)).await.unwrap_err();
        match err {
            Error::Upstream { url, message } => {
                assert!(url.ends_with("/view"));
                assert!(message.contains("412"), "unexpected message: {message}");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_poll_forwards_key() {
        let server = MockServer::start().await;
        Mock::given(path("/qrcode/poll"))
            .and(query_param("qrcode_key", "k-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "code": 86101, "message": "未扫码" }
            })))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let data = api.poll("k-1", &bundle(&api)).await.unwrap();
        assert_eq!(data["code"], 86101);
    }
}
