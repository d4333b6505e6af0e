//! Map client errors onto retry error kinds.

use super::policy::ErrorKind;
use crate::error::ClientError;

/// Classify an error from one request attempt.
pub fn classify(e: &ClientError) -> ErrorKind {
    match e {
        ClientError::AccessDenied(_)
        | ClientError::StreamClosed
        | ClientError::InvalidUrl(_)
        | ClientError::RetriesExhausted { .. } => ErrorKind::Fatal,
        ClientError::CredentialExpired(_) => ErrorKind::Credential,
        ClientError::Http { .. }
        | ClientError::Curl(_)
        | ClientError::Multi(_)
        | ClientError::Io(_)
        | ClientError::MissingRedirect(_) => ErrorKind::Transport,
    }
}
