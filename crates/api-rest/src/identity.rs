//! Per-request caller resolution.

use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use icr_core::CallerIdentity;
use std::convert::Infallible;

/// The caller behind a request, resolved from the session cookie.
///
/// Never rejects: requests without a valid session run as the unknown caller.
#[derive(Clone, Debug)]
pub struct Caller(pub CallerIdentity);

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok());
        Ok(Self(
            state
                .auth
                .identity_from_cookie_header(cookie, chrono::Utc::now()),
        ))
    }
}
