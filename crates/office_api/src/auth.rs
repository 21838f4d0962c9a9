//! Request authentication context.
//!
//! The boundary only checks that a credential is present and uses a known
//! scheme. Credential verification belongs to the hosting service.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Authorization scheme supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

impl AuthScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Bearer => "bearer",
        }
    }
}

/// Authenticated caller context for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub scheme: AuthScheme,
    token: String,
    /// Correlates log lines of a single request.
    pub request_id: String,
}

impl RequestContext {
    /// Builds a context from a raw `Authorization` header value.
    pub fn from_authorization(header: Option<&str>) -> Result<Self, AuthError> {
        let header = header
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::Missing)?;

        let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
        let scheme = if scheme.eq_ignore_ascii_case("basic") {
            AuthScheme::Basic
        } else if scheme.eq_ignore_ascii_case("bearer") {
            AuthScheme::Bearer
        } else {
            return Err(AuthError::UnsupportedScheme(scheme.to_string()));
        };

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        Ok(Self {
            scheme,
            token: token.to_string(),
            request_id: Uuid::new_v4().to_string(),
        })
    }

    /// Raw credential; never logged.
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Authentication failures, all reported as 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    UnsupportedScheme(String),
    EmptyToken,
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing Authorization header"),
            Self::UnsupportedScheme(scheme) => {
                write!(f, "unsupported authorization scheme `{scheme}`")
            }
            Self::EmptyToken => write!(f, "authorization token is empty"),
        }
    }
}

impl Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::{AuthError, AuthScheme, RequestContext};

    #[test]
    fn accepts_basic_and_bearer_schemes() {
        let basic = RequestContext::from_authorization(Some("Basic bWlmb3M6cGFzc3dvcmQ="))
            .expect("basic credential");
        assert_eq!(basic.scheme, AuthScheme::Basic);
        assert_eq!(basic.token(), "bWlmb3M6cGFzc3dvcmQ=");

        let bearer = RequestContext::from_authorization(Some("bearer abc.def"))
            .expect("bearer credential");
        assert_eq!(bearer.scheme, AuthScheme::Bearer);
        assert_ne!(basic.request_id, bearer.request_id);
    }

    #[test]
    fn rejects_missing_or_malformed_credentials() {
        assert_eq!(
            RequestContext::from_authorization(None).unwrap_err(),
            AuthError::Missing
        );
        assert_eq!(
            RequestContext::from_authorization(Some("  ")).unwrap_err(),
            AuthError::Missing
        );
        assert_eq!(
            RequestContext::from_authorization(Some("Bearer ")).unwrap_err(),
            AuthError::EmptyToken
        );
        assert!(matches!(
            RequestContext::from_authorization(Some("Digest x")).unwrap_err(),
            AuthError::UnsupportedScheme(scheme) if scheme == "Digest"
        ));
    }
}
