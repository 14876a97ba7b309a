//! Credentials attached to outgoing requests.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Credential attached to every request made through a client.
///
/// The library does not implement any authentication flow; it only carries
/// a pre-obtained credential into the `Authorization` header. Bearer tokens
/// win over basic credentials when both could apply, matching the server's
/// documented precedence.
#[derive(Debug, Clone, Default)]
pub enum Credential {
    /// Unauthenticated requests.
    #[default]
    Anonymous,
    /// HTTP basic authentication.
    Basic {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
    /// Pre-obtained access token, sent as `Bearer <token>`.
    Bearer(String),
}

impl Credential {
    /// Creates a basic-auth credential.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates a bearer-token credential.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Value for the `Authorization` header, if any.
    pub(crate) fn authorization_header(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { username, password } => {
                let raw = format!("{username}:{password}");
                Some(format!("Basic {}", BASE64.encode(raw)))
            }
            Self::Bearer(token) => Some(format!("Bearer {token}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_has_no_header() {
        assert_eq!(Credential::Anonymous.authorization_header(), None);
    }

    #[test]
    fn test_basic_header() {
        let credential = Credential::basic("user", "pass");
        assert_eq!(
            credential.authorization_header().as_deref(),
            Some("Basic dXNlcjpwYXNz")
        );
    }

    #[test]
    fn test_bearer_header() {
        let credential = Credential::bearer("abc123");
        assert_eq!(
            credential.authorization_header().as_deref(),
            Some("Bearer abc123")
        );
    }
}
