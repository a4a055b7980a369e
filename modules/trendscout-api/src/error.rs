use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use trendscout::{QuotaCheck, UsageFeature};
use trendscout_common::{ErrorBody, ErrorKind, TrendError};

/// An error response: status, `{ok, error, kind}` body, and `Retry-After`
/// when throttled.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn from_trend(err: TrendError, expose_internal: bool) -> Self {
        let status = match &err {
            TrendError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TrendError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            TrendError::Internal(e) => {
                error!(error = %format!("{e:#}"), "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let retry_after_secs = match &err {
            TrendError::Throttled { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        Self {
            status,
            body: err.to_body(expose_internal),
            retry_after_secs,
        }
    }

    pub fn quota_exceeded(feature: UsageFeature, check: QuotaCheck) -> Self {
        let feature = serde_json::to_value(feature)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{feature:?}"));
        Self {
            status: StatusCode::FORBIDDEN,
            body: ErrorBody {
                ok: false,
                error: format!(
                    "Monthly {feature} limit of {} reached. Upgrade your plan to continue.",
                    check.limit
                ),
                kind: ErrorKind::QuotaExceeded,
            },
            retry_after_secs: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::from_trend(TrendError::InvalidInput(message.into()), false)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
