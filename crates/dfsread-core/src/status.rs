//! File metadata operation (`op=GETFILESTATUS`).

use std::io;

use serde::Deserialize;
use url::Url;

use crate::error::ClientError;
use crate::exclude::ExcludeNodes;
use crate::http::HttpConnection;
use crate::op::Op;
use crate::runner::{self, ClientContext, Runner};
use crate::urls;

/// Metadata-envelope body limit.
const STATUS_BODY_LIMIT: u64 = 256 * 1024;

/// Subset of the FileStatus envelope this client consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct FileStatus {
    pub length: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "modificationTime", default)]
    pub modification_time: u64,
    #[serde(rename = "accessTime", default)]
    pub access_time: u64,
    #[serde(rename = "blockSize", default)]
    pub block_size: u64,
    #[serde(default)]
    pub replication: u32,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub permission: String,
}

#[derive(Debug, Deserialize)]
struct FileStatusEnvelope {
    #[serde(rename = "FileStatus")]
    file_status: FileStatus,
}

/// Decode the `{"FileStatus": {...}}` envelope.
pub(crate) fn parse_file_status(body: &str) -> Result<FileStatus, ClientError> {
    serde_json::from_str::<FileStatusEnvelope>(body)
        .map(|envelope| envelope.file_status)
        .map_err(|e| {
            ClientError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed FileStatus response: {}", e),
            ))
        })
}

struct StatusRunner<'a> {
    ctx: &'a ClientContext,
    path: &'a str,
    exclude: ExcludeNodes,
    conn: Option<HttpConnection>,
}

impl Runner for StatusRunner<'_> {
    type Output = FileStatus;

    fn op(&self) -> Op {
        Op::GetFileStatus
    }

    fn context(&self) -> &ClientContext {
        self.ctx
    }

    fn exclude(&self) -> &ExcludeNodes {
        &self.exclude
    }

    fn build_url(&mut self, principal: &str) -> Result<Url, ClientError> {
        urls::to_url(
            &self.ctx.base,
            Op::GetFileStatus,
            self.path,
            principal,
            &[],
            &self.exclude,
        )
    }

    fn accept_connection(&mut self, conn: HttpConnection) -> Result<(), ClientError> {
        self.conn = Some(conn);
        Ok(())
    }

    fn produce(&mut self) -> Result<FileStatus, ClientError> {
        let mut conn = self.conn.take().ok_or_else(|| {
            ClientError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "no connection established",
            ))
        })?;
        let body = conn.read_body_string(STATUS_BODY_LIMIT)?;
        parse_file_status(&body)
    }
}

/// Fetch file metadata from the name node.
pub(crate) fn get_file_status(ctx: &ClientContext, path: &str) -> Result<FileStatus, ClientError> {
    let mut status_runner = StatusRunner {
        ctx,
        path,
        exclude: ExcludeNodes::new(),
        conn: None,
    };
    runner::run(&mut status_runner)
}
