//! Acting-user extraction from request headers.

use crate::error::ApiError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use ward_core::ActingUser;

pub const ACTING_USER_HEADER: &str = "x-acting-user";
pub const ACTING_ROLE_HEADER: &str = "x-acting-role";

/// The clinician on whose behalf a write is made, taken from the
/// `x-acting-user` and `x-acting-role` headers.
pub struct Acting(pub ActingUser);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Acting {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        ActingUser::new(header(ACTING_USER_HEADER), header(ACTING_ROLE_HEADER))
            .map(Acting)
            .map_err(|e| {
                ApiError::bad_request(format!(
                    "{e} (set the {ACTING_USER_HEADER} and {ACTING_ROLE_HEADER} headers)"
                ))
            })
    }
}
