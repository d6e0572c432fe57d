use crate::error::Result;
use crate::extract::Caller;
use crate::model::{
    CreateUrlRequest, OverviewResponse, PublicQuery, PublicUrlResponse, UpdateUrlRequest,
    UrlResponse,
};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use snaplink_analytics::AnalyticsSummary;
use snaplink_core::ShortCode;

pub async fn create_url_handler(
    State(state): State<AppState>,
    caller: Option<Caller>,
    Json(request): Json<CreateUrlRequest>,
) -> Result<(StatusCode, Json<UrlResponse>)> {
    let owner = caller.map(|Caller(requester)| requester.id);
    let params = request.into_params(owner)?;

    let entity = state.shortener().create(params).await?;
    Ok((
        StatusCode::CREATED,
        Json(UrlResponse::from_entity(entity, state.base_url())),
    ))
}

pub async fn list_owned_urls_handler(
    State(state): State<AppState>,
    Caller(requester): Caller,
) -> Result<Json<Vec<UrlResponse>>> {
    let entities = state.shortener().list_by_owner(&requester.id).await?;
    Ok(Json(
        entities
            .into_iter()
            .map(|entity| UrlResponse::from_entity(entity, state.base_url()))
            .collect(),
    ))
}

pub async fn get_url_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Caller(requester): Caller,
) -> Result<Json<UrlResponse>> {
    let code = ShortCode::new(code)?;
    let entity = state.shortener().get(&code, &requester).await?;
    Ok(Json(UrlResponse::from_entity(entity, state.base_url())))
}

pub async fn update_url_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Caller(requester): Caller,
    Json(request): Json<UpdateUrlRequest>,
) -> Result<Json<UrlResponse>> {
    let code = ShortCode::new(code)?;
    let entity = state
        .shortener()
        .update(&code, &requester, request.into_params()?)
        .await?;
    Ok(Json(UrlResponse::from_entity(entity, state.base_url())))
}

pub async fn delete_url_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Caller(requester): Caller,
) -> Result<StatusCode> {
    let code = ShortCode::new(code)?;
    state.shortener().delete(&code, &requester).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn analytics_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Caller(requester): Caller,
) -> Result<Json<AnalyticsSummary>> {
    let code = ShortCode::new(code)?;
    Ok(Json(state.shortener().analytics_for(&code, &requester).await?))
}

pub async fn overview_handler(
    State(state): State<AppState>,
    Caller(requester): Caller,
) -> Result<Json<OverviewResponse>> {
    let overview = state.shortener().owner_overview(&requester.id).await?;
    Ok(Json(OverviewResponse::from_overview(
        overview,
        state.base_url(),
    )))
}

pub async fn list_public_urls_handler(
    State(state): State<AppState>,
    Query(query): Query<PublicQuery>,
) -> Result<Json<Vec<PublicUrlResponse>>> {
    let entities = state.shortener().list_public(query.limit).await?;
    Ok(Json(
        entities
            .into_iter()
            .map(|entity| PublicUrlResponse::from_entity(entity, state.base_url()))
            .collect(),
    ))
}
