// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP server command.
//!
//! Every request path names a template under the template directory:
//! `/news/list.htm` renders `news/list.htm`, and a path ending in `/`
//! renders the configured index template of that directory. The request
//! URL and an optional `?lang=` parameter are added to the fixture context.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use cmstags::{Engine, HtmlResponse, RenderContext, TagError};
use tracing::{error, info};

use crate::commands::build_site;
use crate::config::Config;

/// Shared application state for the server.
#[derive(Debug)]
pub struct AppState {
    /// Template engine.
    pub engine: Engine,
    /// Base context for every request.
    pub context: RenderContext,
    /// Template rendered for directory paths.
    pub index: String,
}

/// Builds the router serving `state`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new().fallback(page_handler).with_state(state)
}

/// Runs the server.
pub async fn run(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
    fixtures: Option<&Path>,
) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let (engine, context) = build_site(&config, fixtures)?;
    let state = Arc::new(AppState {
        engine,
        context,
        index: config.server.index.clone(),
    });

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);
    info!(template_dir = %config.engine.template_dir, "serving templates");
    println!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Maps a request path to a template name.
pub fn template_name(path: &str, index: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        format!("{}{}", trimmed, index)
    } else {
        trimmed.to_string()
    }
}

fn request_context(base: &RenderContext, uri: &Uri) -> RenderContext {
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let mut ctx = base.clone().with_request_url(url);
    if let Some(query) = uri.query() {
        let lang = form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "lang")
            .map(|(_, value)| value.into_owned());
        if let Some(lang) = lang.filter(|l| !l.is_empty()) {
            ctx = ctx.with_lang(lang);
        }
    }
    ctx
}

async fn page_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let name = template_name(uri.path(), &state.index);
    let ctx = request_context(&state.context, &uri);

    let worker = state.clone();
    let rendered =
        tokio::task::spawn_blocking(move || worker.engine.render_response(&name, &ctx)).await;

    match rendered {
        Ok(Ok(page)) => into_http(page),
        Ok(Err(TagError::Resolution(message))) => {
            info!(path = %uri.path(), %message, "template not found");
            into_http(HtmlResponse::not_found("<h1>404 Not Found</h1>"))
        }
        Ok(Err(err)) => {
            error!(path = %uri.path(), error = %err, "render failed");
            into_http(HtmlResponse::internal_error("<h1>500 Internal Server Error</h1>"))
        }
        Err(err) => {
            error!(path = %uri.path(), error = %err, "render task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Converts an engine response into an axum response.
pub fn into_http(page: HtmlResponse) -> Response {
    let mut builder = Response::builder().status(page.status);
    for (key, value) in &page.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
        .body(Body::from(page.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
