//! Credential seam: principal resolution and refresh.

use crate::error::ClientError;

/// Identity and credential provider for outgoing requests.
///
/// `check_and_refresh` may block on an external re-authentication round
/// trip; an implementation shared across streams must serialize it
/// internally.
pub trait CredentialProvider: Send + Sync {
    /// Acting identity, sent as the `user.name` parameter.
    fn current_user(&self) -> String;

    /// Real identity behind a proxy identity, when one exists.
    fn real_user(&self) -> Option<String> {
        None
    }

    /// Refresh credentials; called before pre-authenticated operations and
    /// after an expired-credential response.
    fn check_and_refresh(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// The principal a request runs as: the real user when the acting identity
/// is a proxy, the acting identity otherwise.
pub fn resolve_principal(provider: &dyn CredentialProvider) -> String {
    provider.real_user().unwrap_or_else(|| provider.current_user())
}

/// Static credentials: fixed user, refresh is a no-op.
#[derive(Debug, Clone)]
pub struct SimpleCredentials {
    user: String,
    real_user: Option<String>,
}

impl SimpleCredentials {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            real_user: None,
        }
    }

    /// Proxy identity acting on behalf of `real_user`.
    pub fn proxied(user: impl Into<String>, real_user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            real_user: Some(real_user.into()),
        }
    }
}

impl CredentialProvider for SimpleCredentials {
    fn current_user(&self) -> String {
        self.user.clone()
    }

    fn real_user(&self) -> Option<String> {
        self.real_user.clone()
    }
}
