pub mod keywords;
pub mod trends;

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use tracing::{error, warn};

use trendscout::{QuotaGovernor, UsageFeature};

use crate::error::ApiError;

/// Header set by the auth proxy in front of the API.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Who is calling: the authenticated user (if any) and the peer address.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user_id: Option<String>,
    pub addr: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        // absent when the router is driven without connect info (tests)
        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self { user_id, addr })
    }
}

/// Reject when the user's monthly quota for `feature` is used up. A
/// governor failure lets the request through.
pub(crate) async fn guard_quota(
    quota: &dyn QuotaGovernor,
    user_id: &str,
    feature: UsageFeature,
) -> Result<(), ApiError> {
    match quota.check(user_id, feature).await {
        Ok(check) if !check.allowed => {
            warn!(user_id, ?feature, limit = check.limit, "Quota exceeded");
            Err(ApiError::quota_exceeded(feature, check))
        }
        Ok(_) => Ok(()),
        Err(e) => {
            error!(user_id, ?feature, error = %e, "Quota check failed, allowing request");
            Ok(())
        }
    }
}

/// Count one use of `feature`. Failures are logged only.
pub(crate) async fn record_usage(quota: &dyn QuotaGovernor, user_id: &str, feature: UsageFeature) {
    if let Err(e) = quota.increment(user_id, feature, 1).await {
        error!(user_id, ?feature, error = %e, "Quota increment failed");
    }
}
