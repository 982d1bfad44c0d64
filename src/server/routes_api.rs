//! Relayed bilibili API routes.
//!
//! Each handler validates its query, builds a header bundle from the inbound
//! request and returns the upstream `data` field as JSON.

use super::error::AppError;
use super::{header_bundle, require};
use crate::server::AppContext;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/generate", get(generate))
        .route("/poll", get(poll))
        .route("/view", get(view))
        .route("/playurl", get(playurl))
}

#[derive(Debug, Deserialize)]
struct GenerateQuery {
    cookie: Option<String>,
}

async fn generate(
    State(ctx): State<AppContext>,
    Query(query): Query<GenerateQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let bundle = header_bundle(&ctx, query.cookie.as_deref(), &headers);
    Ok(Json(ctx.upstream.generate(&bundle).await?))
}

/// `cookie` is optional here; a pending login has none yet.
#[derive(Debug, Deserialize)]
struct PollQuery {
    qrcode_key: Option<String>,
    cookie: Option<String>,
}

async fn poll(
    State(ctx): State<AppContext>,
    Query(query): Query<PollQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let key = require("qrcode_key", &query.qrcode_key)?;
    let bundle = header_bundle(&ctx, query.cookie.as_deref(), &headers);
    Ok(Json(ctx.upstream.poll(key, &bundle).await?))
}

#[derive(Debug, Deserialize)]
struct ViewQuery {
    bvid: Option<String>,
    cookie: Option<String>,
}

async fn view(
    State(ctx): State<AppContext>,
    Query(query): Query<ViewQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let bvid = require("bvid", &query.bvid)?;
    let cookie = require("cookie", &query.cookie)?;
    let bundle = header_bundle(&ctx, Some(cookie), &headers);
    Ok(Json(ctx.upstream.view(bvid, &bundle).await?))
}

#[derive(Debug, Deserialize)]
struct PlayUrlQuery {
    bvid: Option<String>,
    cid: Option<String>,
    cookie: Option<String>,
}

async fn playurl(
    State(ctx): State<AppContext>,
    Query(query): Query<PlayUrlQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let bvid = require("bvid", &query.bvid)?;
    let cid = require("cid", &query.cid)?;
    let cookie = require("cookie", &query.cookie)?;
    let bundle = header_bundle(&ctx, Some(cookie), &headers);
    Ok(Json(ctx.upstream.playurl(bvid, cid, &bundle).await?))
}
