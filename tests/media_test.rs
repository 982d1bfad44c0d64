//! Download-and-remux route tests against a mock CDN.

mod common;

use axum::http::{header, StatusCode};
use bilirelay_common::StreamKind;
use common::{q, TestHarness};
use wiremock::matchers::{header as header_eq, method, path};
use wiremock::{Mock, ResponseTemplate};

fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

#[tokio::test]
async fn test_audio_is_served_as_flac_attachment() {
    let harness = TestHarness::new().await;
    let audio = payload(70_001, 7);
    Mock::given(method("GET"))
        .and(path("/upgcxcode/a123.m4s"))
        .and(header_eq("cookie", "SESSDATA=abc"))
        .and(header_eq("referer", "https://www.bilibili.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio.clone()))
        .expect(1)
        .mount(&harness.mock)
        .await;

    let uri = format!(
        "/api/audio?aurl={}&filename=song&cookie={}",
        q(&harness.cdn_url("/upgcxcode/a123.m4s?deadline=1&upsig=x")),
        q("SESSDATA=abc")
    );

    let (status, headers, body) = harness.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/flac");
    assert_eq!(headers[header::CONTENT_LENGTH], audio.len().to_string().as_str());
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"song.flac\"; filename*=UTF-8''song.flac"
    );
    assert_eq!(body.as_ref(), audio.as_slice());
    assert!(harness.cache_dir.path().join("a123.m4s").exists());
    assert!(harness.cache_dir.path().join("song.flac").exists());

    // Served from cache: the mock's expect(1) fails the test on a refetch.
    let (status, _, body) = harness.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_ref(), audio.as_slice());
    assert_eq!(harness.remuxer.calls(), 1);
}

#[tokio::test]
async fn test_video_combines_audio_then_video() {
    let harness = TestHarness::new().await;
    let audio = payload(9_000, 1);
    let video = payload(150_000, 2);
    Mock::given(path("/upgcxcode/a123.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio.clone()))
        .expect(1)
        .mount(&harness.mock)
        .await;
    Mock::given(path("/upgcxcode/v456.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(video.clone()))
        .expect(1)
        .mount(&harness.mock)
        .await;

    let uri = format!(
        "/api/video?aurl={}&vurl={}&filename=clip&cookie=c",
        q(&harness.cdn_url("/upgcxcode/a123.m4s")),
        q(&harness.cdn_url("/upgcxcode/v456.m4s")),
    );

    let (status, headers, body) = harness.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "video/x-matroska");

    let mut expected = audio.clone();
    expected.extend_from_slice(&video);
    assert_eq!(body.len(), expected.len());
    assert_eq!(body.as_ref(), expected.as_slice());

    let inputs = harness.remuxer.inputs.lock().unwrap();
    let kinds: Vec<StreamKind> = inputs[0].iter().map(|input| input.kind).collect();
    assert_eq!(kinds, vec![StreamKind::Audio, StreamKind::Video]);
    assert_eq!(inputs[0][0].path, harness.cache_dir.path().join("a123.m4s"));
    assert_eq!(inputs[0][1].path, harness.cache_dir.path().join("v456.m4s"));
}

#[tokio::test]
async fn test_video_download_failure_keeps_audio() {
    let harness = TestHarness::new().await;
    Mock::given(path("/upgcxcode/a123.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload(1_000, 3)))
        .mount(&harness.mock)
        .await;
    Mock::given(path("/upgcxcode/v456.m4s"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&harness.mock)
        .await;

    let uri = format!(
        "/api/video?aurl={}&vurl={}&filename=clip&cookie=c",
        q(&harness.cdn_url("/upgcxcode/a123.m4s")),
        q(&harness.cdn_url("/upgcxcode/v456.m4s?upsig=secret")),
    );

    let (status, body) = harness.get_json(&uri).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "download_failed");
    assert_eq!(body["stage"], "download");
    assert!(!body["error"].as_str().unwrap().contains("secret"));

    assert_eq!(harness.remuxer.calls(), 0);
    assert!(harness.cache_dir.path().join("a123.m4s").exists());
    assert!(!harness.cache_dir.path().join("v456.m4s").exists());
    assert!(!harness.cache_dir.path().join("clip.mkv").exists());
}

#[tokio::test]
async fn test_unsafe_filename_is_rejected() {
    let harness = TestHarness::new().await;

    let uri = format!(
        "/api/audio?aurl={}&filename={}&cookie=c",
        q(&harness.cdn_url("/upgcxcode/a123.m4s")),
        q("../../etc/passwd"),
    );

    let (status, body) = harness.get_json(&uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
    assert!(harness.mock.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unicode_filename_disposition() {
    let harness = TestHarness::new().await;
    Mock::given(path("/upgcxcode/a123.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload(64, 4)))
        .mount(&harness.mock)
        .await;

    let uri = format!(
        "/api/audio?aurl={}&filename={}&cookie=c",
        q(&harness.cdn_url("/upgcxcode/a123.m4s")),
        q("晴天"),
    );

    let (status, headers, _) = harness.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"__.flac\"; filename*=UTF-8''%E6%99%B4%E5%A4%A9.flac"
    );
    assert!(harness.cache_dir.path().join("晴天.flac").exists());
}
