//! Admin token guard
//!
//! The management API is protected by a single shared token, provided in the `Authorization`
//! header as a bearer token

use std::sync::Arc;

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use super::Error;

/// The configured admin token
#[derive(Clone)]
pub struct AdminToken {
    /// The token itself
    token: Arc<str>,
}

impl AdminToken {
    /// Create the admin token from its configured value
    pub fn new(token: &str) -> Self {
        Self {
            token: Arc::from(token),
        }
    }

    /// Does the candidate match the token?
    ///
    /// Compares all bytes, regardless of where the first difference is
    fn matches(&self, candidate: &str) -> bool {
        let token = self.token.as_bytes();
        let candidate = candidate.as_bytes();

        token.len() == candidate.len()
            && token
                .iter()
                .zip(candidate)
                .fold(0, |difference, (a, b)| difference | (a ^ b))
                == 0
    }
}

/// Proof that the request carries the admin token
///
/// Add it to a handler to require the admin token
pub struct Admin;

impl<S> FromRequestParts<S> for Admin
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| Error::unauthorized("Missing API token"))?;

        let Extension(admin_token) = parts
            .extract::<Extension<AdminToken>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get the admin token"))?;

        if admin_token.matches(bearer.token()) {
            Ok(Admin)
        } else {
            tracing::debug!("Rejected request with an invalid API token");

            Err(Error::unauthorized("Invalid API token"))
        }
    }
}
