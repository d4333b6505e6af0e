//! Client facade: opens streams and runs metadata operations.

use std::sync::Arc;

use url::Url;

use crate::auth::{CredentialProvider, SimpleCredentials};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::runner::ClientContext;
use crate::stats::ReadStatistics;
use crate::status::{self, FileStatus};
use crate::stream::DfsInputStream;

/// Read client bound to one name-node base URL.
///
/// Streams opened from one client share its credential provider and
/// statistics; each stream owns its own cursor and exclusion set.
pub struct DfsClient {
    ctx: Arc<ClientContext>,
    stats: ReadStatistics,
}

impl DfsClient {
    /// Connect a client to a name-node base URL, e.g. `http://namenode:9870`.
    pub fn new(
        base: &str,
        config: ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(base)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base, e)))?;
        let policy = config.retry_policy();
        Ok(Self {
            ctx: Arc::new(ClientContext {
                base,
                config,
                policy,
                credentials,
            }),
            stats: ReadStatistics::new(),
        })
    }

    /// Client with a static user identity.
    pub fn with_user(base: &str, config: ClientConfig, user: &str) -> Result<Self, ClientError> {
        Self::new(base, config, Arc::new(SimpleCredentials::new(user)))
    }

    /// Open `path` for streaming reads. `read_param` is forwarded opaquely
    /// to the backend on every request this stream issues.
    pub fn open(
        &self,
        path: &str,
        read_param: Option<&str>,
    ) -> Result<DfsInputStream, ClientError> {
        self.stats.increment_read_ops(1);
        DfsInputStream::open(
            Arc::clone(&self.ctx),
            path,
            self.ctx.config.buffer_size,
            read_param.map(str::to_string),
            self.stats.clone(),
        )
    }

    /// File metadata from the name node.
    pub fn status(&self, path: &str) -> Result<FileStatus, ClientError> {
        status::get_file_status(&self.ctx, path)
    }

    pub fn statistics(&self) -> &ReadStatistics {
        &self.stats
    }

    pub fn config(&self) -> &ClientConfig {
        &self.ctx.config
    }
}
