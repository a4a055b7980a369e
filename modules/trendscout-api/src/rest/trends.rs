use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use trendscout::{TrendRequest, UsageFeature};
use trendscout_common::{HistoryRecord, TrendReport};

use super::{guard_quota, record_usage, Caller};
use crate::error::ApiError;
use crate::AppState;

pub async fn api_analyze(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Result<Json<TrendRequest>, JsonRejection>,
) -> Result<Json<TrendReport>, ApiError> {
    let Json(mut request) = body.map_err(|e| ApiError::invalid_input(e.body_text()))?;

    // header identity wins over the body
    let user_id = caller
        .user_id
        .or_else(|| request.user_id.take())
        .filter(|u| !u.trim().is_empty());
    if let Some(user_id) = user_id.as_deref() {
        guard_quota(state.quota.as_ref(), user_id, UsageFeature::TrendSearches).await?;
    }
    request.user_id = user_id.clone();
    request.caller_id = caller.addr;

    let report = state
        .service
        .analyze(request)
        .await
        .map_err(|e| ApiError::from_trend(e, state.expose_internal_errors))?;

    if let (Some(user_id), false) = (user_id.as_deref(), report.cached) {
        record_usage(state.quota.as_ref(), user_id, UsageFeature::TrendSearches).await;
    }
    Ok(Json(report))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    user_id: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    ok: bool,
    history: Vec<HistoryRecord>,
    count: usize,
}

pub async fn api_history(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    // header identity wins; the query only names a user for header-less callers
    let user_id = caller
        .user_id
        .filter(|u| !u.trim().is_empty())
        .or(query.user_id)
        .unwrap_or_default();
    let history = state
        .service
        .history(&user_id, query.limit)
        .await
        .map_err(|e| ApiError::from_trend(e, state.expose_internal_errors))?;

    Ok(Json(HistoryResponse {
        ok: true,
        count: history.len(),
        history,
    }))
}
