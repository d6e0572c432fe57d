use crate::error::{AppError, Result};
use crate::extract::Visitor;
use crate::model::AccessRequest;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use snaplink_core::ShortCode;
use snaplink_redirector::{Resolution, SessionGrants};

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Grants are not carried across requests, so protected links always
/// answer 401 here and are unlocked through [`access_handler`].
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Visitor(context): Visitor,
) -> Result<Response> {
    resolve(&state, code, None, context).await
}

pub async fn access_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Visitor(context): Visitor,
    Json(request): Json<AccessRequest>,
) -> Result<Response> {
    resolve(&state, code, Some(request.password.as_str()), context).await
}

async fn resolve(
    state: &AppState,
    code: String,
    candidate: Option<&str>,
    context: snaplink_core::ClickContext,
) -> Result<Response> {
    // a malformed code can never have been stored
    let Ok(code) = ShortCode::new(code) else {
        return Err(AppError::Denied(Resolution::NotFound));
    };

    let mut grants = SessionGrants::new();
    let resolution = state
        .redirector()
        .redirect(&code, &mut grants, candidate, context)
        .await?;

    match resolution {
        Resolution::Allowed(long_url) => Ok(found(long_url)),
        denied => Err(AppError::Denied(denied)),
    }
}
