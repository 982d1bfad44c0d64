//! Download-and-remux routes. Each responds with the finished file as an
//! attachment.

use super::error::AppError;
use super::{header_bundle, require};
use crate::server::AppContext;
use crate::Error;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use bilirelay_common::OutputFormat;
use serde::Deserialize;
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

pub fn media_routes() -> Router<AppContext> {
    Router::new()
        .route("/audio", get(audio))
        .route("/video", get(video))
}

#[derive(Debug, Deserialize)]
struct AudioQuery {
    aurl: Option<String>,
    filename: Option<String>,
    cookie: Option<String>,
}

async fn audio(
    State(ctx): State<AppContext>,
    Query(query): Query<AudioQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let aurl = require("aurl", &query.aurl)?;
    let filename = require("filename", &query.filename)?;
    let cookie = require("cookie", &query.cookie)?;

    let bundle = header_bundle(&ctx, Some(cookie), &headers);
    let output = ctx.pipeline.audio_only(aurl, filename, &bundle).await?;
    Ok(attachment(&output, filename, OutputFormat::Flac).await?)
}

#[derive(Debug, Deserialize)]
struct VideoQuery {
    aurl: Option<String>,
    vurl: Option<String>,
    filename: Option<String>,
    cookie: Option<String>,
}

async fn video(
    State(ctx): State<AppContext>,
    Query(query): Query<VideoQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let aurl = require("aurl", &query.aurl)?;
    let vurl = require("vurl", &query.vurl)?;
    let filename = require("filename", &query.filename)?;
    let cookie = require("cookie", &query.cookie)?;

    let bundle = header_bundle(&ctx, Some(cookie), &headers);
    let output = ctx.pipeline.audio_video(aurl, vurl, filename, &bundle).await?;
    Ok(attachment(&output, filename, OutputFormat::Mkv).await?)
}

/// Stream `path` back as a download named `{name}.{ext}`.
async fn attachment(path: &Path, name: &str, format: OutputFormat) -> crate::Result<Response> {
    let file = File::open(path).await?;
    let size = file.metadata().await?.len();

    let disposition = content_disposition(&format.file_name(name));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| Error::Internal(format!("bad Content-Disposition: {}", e)))?;

    tracing::info!("Serving {} ({} bytes)", path.display(), size);

    let body = Body::from_stream(ReaderStream::new(file));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.mime_type())
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(body)
        .map_err(|e| Error::Internal(e.to_string()))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8
/// name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}
