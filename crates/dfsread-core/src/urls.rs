//! Request URL construction for WebHDFS-style endpoints.
//!
//! Pure helpers: every function is a function of its inputs and retains no
//! state; callers own the parameter slices they pass in.

use url::Url;

use crate::error::ClientError;
use crate::exclude::ExcludeNodes;
use crate::op::Op;

/// REST API prefix on the name node.
pub const API_PREFIX: &str = "/webhdfs/v1";

/// Variadic request parameters appended to a built URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Byte offset the response body should start at.
    Offset(u64),
    /// Buffer-size hint forwarded to the backend.
    BufferSize(usize),
}

/// Build the name-node request URL for `op` against `path`.
///
/// Appends `op`, `user.name`, the variadic parameters, and the current
/// exclusion value when the set is non-empty. The exclusion contribution is
/// recomputed on every call, so a set that grew between attempts shows up
/// in the next build.
pub fn to_url(
    base: &Url,
    op: Op,
    path: &str,
    user: &str,
    params: &[Param],
    exclude: &ExcludeNodes,
) -> Result<Url, ClientError> {
    if base.host_str().is_none() {
        return Err(ClientError::InvalidUrl(format!(
            "base URL has no host: {}",
            base
        )));
    }
    let mut full = base.clone();
    let api_path = if path.starts_with('/') {
        format!("{}{}", API_PREFIX, path)
    } else {
        format!("{}/{}", API_PREFIX, path)
    };
    full.set_path(&api_path);
    full.set_query(None);
    {
        let mut query = full.query_pairs_mut();
        query.append_pair("op", op.op_param());
        query.append_pair("user.name", user);
        for param in params {
            match param {
                Param::Offset(offset) => {
                    query.append_pair("offset", &offset.to_string());
                }
                Param::BufferSize(size) => {
                    query.append_pair("buffersize", &size.to_string());
                }
            }
        }
        if let Some(value) = exclude.as_value() {
            query.append_pair("excludedatanodes", &value);
        }
    }
    Ok(full)
}

/// Remove any `offset` parameter carried over from a previously resolved
/// redirect URL, so the current cursor position is the only offset present
/// on the next build.
pub fn strip_offset_param(url: &Url) -> Url {
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name.as_ref() != "offset")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    let mut out = url.clone();
    out.set_query(None);
    if !remaining.is_empty() {
        let mut query = out.query_pairs_mut();
        for (name, value) in &remaining {
            query.append_pair(name, value);
        }
    }
    out
}

/// Append the cursor offset to a resolved backend URL.
pub fn with_offset(url: &Url, offset: u64) -> Url {
    let mut out = url.clone();
    out.query_pairs_mut()
        .append_pair("offset", &offset.to_string());
    out
}

/// `host:port` identity used for exclusion bookkeeping.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{}:{}", host, port))
}
