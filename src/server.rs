//! HTTP surface for the profile summary endpoint.

use crate::aggregate::LawSummary;
use crate::completion::{CompletionClient, CompletionError, CompletionOutcome, ProfileSummary};
use crate::config::Config;
use crate::error::EndpointError;
use crate::prompt::build_prompt;
use crate::request::SummaryRequest;
use crate::scenarios::{build_scenario_context, ScenarioTable};
use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const PROFILE_SUMMARY_PATH: &str = "/api/profile-summary";

/// Application state shared across requests. Immutable after startup.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// `None` when no API key is configured; every summary request then fails with 500
    pub client: Option<CompletionClient>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, CompletionError> {
        let client = match config.api_key() {
            Ok(key) => Some(CompletionClient::new(&config.groq, key)?),
            Err(e) => {
                warn!("{}; summaries will be refused until it is set", e);
                None
            }
        };
        Ok(Self { config, client })
    }
}

/// Build the router with the endpoint, JSON/CORS headers on every response, and request tracing
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PROFILE_SUMMARY_PATH, any(profile_summary))
        .with_state(Arc::new(state))
        .layer(SetResponseHeaderLayer::overriding(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server
pub async fn run(state: AppState, bind: &str) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}{}", listener.local_addr()?, PROFILE_SUMMARY_PATH);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn profile_summary(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    if method != Method::POST {
        return EndpointError::MethodNotAllowed.into_response();
    }
    if state.client.is_none() {
        error!("summary requested but no Groq API key is configured");
        return EndpointError::ConfigMissing.into_response();
    }

    let request = match SummaryRequest::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match summarize(&state, &request).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Aggregate the decisions, read scenario context, and assemble the prompt
pub async fn prepare_prompt(config: &Config, request: &SummaryRequest) -> String {
    let law_summary = LawSummary::from_decisions(&request.decisions);
    let table = ScenarioTable::load_or_empty(&config.data.scenarios_path).await;
    let scenario_context = build_scenario_context(&request.decisions, table.as_ref());
    build_prompt(
        &request.profile_title,
        &request.counters,
        &law_summary,
        &scenario_context,
    )
}

/// Run the full pipeline for one validated request
pub async fn summarize(
    state: &AppState,
    request: &SummaryRequest,
) -> Result<ProfileSummary, EndpointError> {
    let client = state.client.as_ref().ok_or(EndpointError::ConfigMissing)?;
    let prompt = prepare_prompt(&state.config, request).await;

    match client.complete(&prompt).await {
        Ok(CompletionOutcome::Summary(summary)) => {
            info!(
                decisions = request.decisions.len(),
                model = client.model(),
                "profile summary generated"
            );
            Ok(summary)
        }
        Ok(CompletionOutcome::QuotaExhausted) => {
            warn!("completion API reports exhausted quota");
            Err(EndpointError::UpstreamQuotaExhausted)
        }
        Err(e) => {
            error!(error = %e, "completion request failed");
            Err(EndpointError::UpstreamUnavailable)
        }
    }
}
