//! Admin claim extraction.
//!
//! A request carries the admin claim when it presents the pre-shared admin
//! key, either as `X-Api-Key` or as a bearer token. Keys are compared in
//! constant time to mitigate timing attacks.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, ErrorReply};
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Whether the caller may mutate the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminClaim {
    pub is_admin: bool,
}

impl AdminClaim {
    #[cfg(test)]
    pub fn admin() -> Self {
        Self { is_admin: true }
    }

    #[cfg(test)]
    pub fn visitor() -> Self {
        Self { is_admin: false }
    }

    /// Resolve the claim from request headers.
    ///
    /// With no key configured every caller is admin in development and
    /// nobody is in production.
    pub fn from_headers(headers: &HeaderMap, expected_key: Option<&str>, development: bool) -> Self {
        let Some(expected) = expected_key else {
            return Self {
                is_admin: development,
            };
        };

        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .or_else(|| {
                headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.strip_prefix("Bearer "))
            });

        Self {
            is_admin: provided.is_some_and(|key| constant_time_compare(key.trim(), expected)),
        }
    }

    /// `Forbidden` unless the claim is held.
    pub fn require(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Admin privileges are required for this operation".to_string(),
            ))
        }
    }
}

/// Extractor admitting only admin callers.
///
/// Runs ahead of body and query decoding, so a caller without the claim
/// gets 403 whatever else is wrong with the request.
pub struct RequireAdmin(pub AdminClaim);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ErrorReply;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claim = AdminClaim::from_headers(
            &parts.headers,
            state.config.admin_key.as_deref(),
            state.config.is_development(),
        );
        claim.require().map_err(|error| ErrorReply {
            error,
            verbose: state.config.is_development(),
        })?;
        Ok(Self(claim))
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    a_bytes.ct_eq(b_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_api_key_header_grants_claim() {
        let claim = AdminClaim::from_headers(&headers(&[("x-api-key", "secret")]), Some("secret"), false);
        assert!(claim.is_admin);
    }

    #[test]
    fn test_bearer_token_grants_claim() {
        let claim = AdminClaim::from_headers(
            &headers(&[("authorization", "Bearer secret")]),
            Some("secret"),
            false,
        );
        assert!(claim.is_admin);
    }

    #[test]
    fn test_wrong_or_missing_key_is_visitor() {
        let wrong = AdminClaim::from_headers(&headers(&[("x-api-key", "guess")]), Some("secret"), true);
        assert!(!wrong.is_admin);

        let missing = AdminClaim::from_headers(&HeaderMap::new(), Some("secret"), true);
        assert!(!missing.is_admin);
    }

    #[test]
    fn test_unconfigured_key_depends_on_environment() {
        assert!(AdminClaim::from_headers(&HeaderMap::new(), None, true).is_admin);
        assert!(!AdminClaim::from_headers(&HeaderMap::new(), None, false).is_admin);
    }

    #[test]
    fn test_require() {
        assert!(AdminClaim::admin().require().is_ok());
        assert!(matches!(
            AdminClaim::visitor().require(),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }
}
