//! Operation table: HTTP verb, expected status, redirect and auth properties.

/// Status a redirectable operation's first hop is expected to answer with.
pub const TEMPORARY_REDIRECT: u32 = 307;

/// Read-path operations this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Ranged file read (`op=OPEN`); the name node redirects to the data
    /// node that owns the bytes.
    Open,
    /// File metadata (`op=GETFILESTATUS`); answered by the name node.
    GetFileStatus,
}

impl Op {
    pub fn method(&self) -> &'static str {
        match self {
            Op::Open | Op::GetFileStatus => "GET",
        }
    }

    /// Value of the `op` query parameter.
    pub fn op_param(&self) -> &'static str {
        match self {
            Op::Open => "OPEN",
            Op::GetFileStatus => "GETFILESTATUS",
        }
    }

    /// Success status of the final response.
    pub fn expected_status(&self) -> u32 {
        match self {
            Op::Open | Op::GetFileStatus => 200,
        }
    }

    /// True when the operation resolves through a redirect hop first.
    pub fn redirectable(&self) -> bool {
        matches!(self, Op::Open)
    }

    /// True when the operation must run with pre-authenticated access;
    /// expired credentials are then fatal instead of refreshed.
    pub fn require_auth(&self) -> bool {
        match self {
            Op::Open | Op::GetFileStatus => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_redirectable_status_is_not() {
        assert!(Op::Open.redirectable());
        assert!(!Op::GetFileStatus.redirectable());
    }

    #[test]
    fn op_params_match_wire_names() {
        assert_eq!(Op::Open.op_param(), "OPEN");
        assert_eq!(Op::GetFileStatus.op_param(), "GETFILESTATUS");
        assert_eq!(Op::Open.method(), "GET");
        assert_eq!(Op::Open.expected_status(), 200);
    }
}
