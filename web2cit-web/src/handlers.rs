use axum::{
    Json,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use web2cit_i18n::Translator;
use web2cit_translate::{
    ErrorBody, Format, JsonEnvelope, MediawikiError, Outcome, ReqQuery, Target, TranslateError,
    TranslationSummary, requested_format, resolve_url, translate_request,
};

use crate::state::AppState;
use crate::views;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let t = state.translator(&headers);
    match views::render_home(&state.templates, &t) {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error(&format!("failed to render home page: {}", e), &t),
    }
}

/// `GET /translate?url=...` or `GET /translate?domain=...&path=...`
pub async fn translate(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> Response {
    let t = state.translator(&headers);
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_deref().unwrap_or("").as_bytes())
        .into_owned()
        .collect();

    let query = match ReqQuery::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
        Ok(query) => query,
        Err(e) => {
            let format = requested_format(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            return error_response(&e, format, &t);
        }
    };

    if query.wants_legacy_redirect() {
        if let Target::Url(url) = &query.target {
            return match resolve_url(url) {
                Ok(target) => {
                    let location = query.options.legacy_path(&target.href);
                    info!("Redirecting to {}", location);
                    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
                }
                Err(e) => error_response(&e, query.options.format, &t),
            };
        }
    }

    respond(&state, &query, &t).await
}

/// `GET /[debug/][sandbox/<user>/]<url>`, the path-based entrypoint.
pub async fn legacy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let t = state.translator(&headers);
    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, HEAD")],
            t.t("error-method-not-allowed"),
        )
            .into_response();
    }
    match ReqQuery::from_legacy_path(uri.path(), uri.query()) {
        Ok(query) => respond(&state, &query, &t).await,
        Err(e) => error_response(&e, Format::Html, &t),
    }
}

async fn respond(state: &AppState, query: &ReqQuery, t: &Translator) -> Response {
    let format = query.options.format;
    let summary = match translate_request(state.engine.as_ref(), query, &state.settings, t).await {
        Ok(summary) => summary,
        Err(e) => return error_response(&e, format, t),
    };
    let status = outcome_status(summary.outcome);
    if status != StatusCode::OK {
        warn!(
            "Translation for {} ended with {:?}",
            summary.domain, summary.outcome
        );
    }

    match format {
        Format::Html => match summary.outcome {
            Outcome::NoValidPaths => plain_text(status, outcome_error(&summary, t).message),
            _ => match views::render_results(&state.templates, t, &summary, &state.wiki) {
                Ok(html) => (status, Html(html)).into_response(),
                Err(e) => internal_error(&format!("failed to render results page: {}", e), t),
            },
        },
        Format::Json => (status, Json(summary.to_json())).into_response(),
        Format::Mediawiki => match summary.outcome {
            Outcome::Ok => (status, Json(summary.to_mediawiki())).into_response(),
            _ => (
                status,
                Json(MediawikiError {
                    error: outcome_error(&summary, t),
                }),
            )
                .into_response(),
        },
    }
}

/// Error object for a summary that is not a success.
fn outcome_error(summary: &TranslationSummary, t: &Translator) -> ErrorBody {
    match summary.outcome {
        Outcome::NoValidPaths => ErrorBody {
            name: "NoValidPathsError".to_string(),
            message: t.t_with("error-no-valid-paths", &[summary.domain.clone()]),
        },
        Outcome::Upstream { .. } => summary
            .targets
            .iter()
            .find_map(|target| target.error.clone())
            .unwrap_or_else(|| ErrorBody {
                name: "HTTPResponseError".to_string(),
                message: t.t("error-unexpected"),
            }),
        Outcome::Ok | Outcome::NoTranslation => ErrorBody {
            name: "NoTranslationError".to_string(),
            message: t.t_with("error-no-translation", &[summary.domain.clone()]),
        },
    }
}

fn outcome_status(outcome: Outcome) -> StatusCode {
    match outcome {
        Outcome::Upstream { status } => upstream_status(status),
        other => StatusCode::from_u16(other.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Upstream failures are re-emitted as is when they are HTTP error codes.
fn upstream_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(code) if code.is_client_error() || code.is_server_error() => code,
        _ => StatusCode::BAD_GATEWAY,
    }
}

pub fn error_response(error: &TranslateError, format: Format, t: &Translator) -> Response {
    let status = match error {
        TranslateError::ExternalResource { status, .. } => upstream_status(*status),
        other => StatusCode::from_u16(other.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    };
    if let TranslateError::Unexpected(detail) = error {
        error!("Unexpected error: {}", detail);
    } else {
        info!("Rejected request: {}", error);
    }

    let body = error.body(t);
    match format {
        Format::Html => plain_text(status, body.message),
        Format::Json => (status, Json(JsonEnvelope::error(body))).into_response(),
        Format::Mediawiki => (status, Json(MediawikiError { error: body })).into_response(),
    }
}

fn plain_text(status: StatusCode, message: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

fn internal_error(detail: &str, t: &Translator) -> Response {
    error!("{}", detail);
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, t.t("error-unexpected"))
}
