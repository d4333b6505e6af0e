//! Typed read-client errors.
//!
//! Retry classification over these lives in `crate::retry`; the stream layer
//! converts into `std::io::Error` at the `Read`/`Seek` boundary.

use std::fmt;
use std::io;

/// Error produced by the read client.
#[derive(Debug)]
pub enum ClientError {
    /// Server rejected the principal (access-control failure). Never retried.
    AccessDenied(String),
    /// Credential or token no longer valid; retried once per refresh unless
    /// the operation requires pre-authenticated access.
    CredentialExpired(String),
    /// Non-success HTTP response that maps to no richer kind.
    Http { code: u32, message: Option<String> },
    /// curl reported a transport error (connect, DNS, reset, timeout).
    Curl(curl::Error),
    /// curl multi-interface bookkeeping error.
    Multi(curl::MultiError),
    /// I/O failure while reading a response body.
    Io(io::Error),
    /// A redirect was expected but the response carried no usable Location.
    MissingRedirect(u32),
    /// A request URL could not be built or parsed.
    InvalidUrl(String),
    /// Read or seek after close.
    StreamClosed,
    /// Credential-refresh retries exhausted without a successful attempt.
    RetriesExhausted { attempts: u32, last: Box<ClientError> },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::AccessDenied(msg) => write!(f, "access denied: {}", msg),
            ClientError::CredentialExpired(msg) => write!(f, "credential expired: {}", msg),
            ClientError::Http { code, message } => match message {
                Some(msg) => write!(f, "HTTP {}: {}", code, msg),
                None => write!(f, "HTTP {}", code),
            },
            ClientError::Curl(e) => write!(f, "{}", e),
            ClientError::Multi(e) => write!(f, "{}", e),
            ClientError::Io(e) => write!(f, "{}", e),
            ClientError::MissingRedirect(code) => {
                write!(f, "HTTP {} carried no Location header", code)
            }
            ClientError::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
            ClientError::StreamClosed => write!(f, "stream closed"),
            ClientError::RetriesExhausted { attempts, last } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, last)
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Curl(e) => Some(e),
            ClientError::Multi(e) => Some(e),
            ClientError::Io(e) => Some(e),
            ClientError::RetriesExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Io(e)
    }
}

impl From<curl::Error> for ClientError {
    fn from(e: curl::Error) -> Self {
        ClientError::Curl(e)
    }
}

impl From<curl::MultiError> for ClientError {
    fn from(e: curl::MultiError) -> Self {
        ClientError::Multi(e)
    }
}

impl From<ClientError> for io::Error {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
