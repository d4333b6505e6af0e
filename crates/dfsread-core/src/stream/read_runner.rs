//! Read state machine: reconnect-at-cursor, bounded and buffered body,
//! exclusion bookkeeping.

use std::io::{BufReader, Read};
use std::sync::Arc;

use url::Url;

use crate::error::ClientError;
use crate::exclude::ExcludeNodes;
use crate::http::HttpConnection;
use crate::op::Op;
use crate::runner::{self, ClientContext, Runner, UrlRunner};
use crate::stats::ReadStatistics;
use crate::urls::{self, Param};

/// Connection state of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunnerState {
    /// No connection; the next read opens one at the cursor.
    Seeking,
    /// Connection established, bytes flowing.
    Open,
    /// Connection torn down after a failure; the next read reconnects
    /// through the name node.
    Disconnected,
    /// Terminal; reads fail.
    Closed,
}

/// Body of an open connection: bounded by Content-Length when the response
/// declared one, then buffered for throughput.
type Body = BufReader<std::io::Take<HttpConnection>>;

pub(crate) struct StreamCore {
    pub(crate) ctx: Arc<ClientContext>,
    pub(crate) path: String,
    pub(crate) buffer_size: usize,
    pub(crate) read_param: Option<String>,
    pub(crate) state: RunnerState,
    pub(crate) pos: u64,
    /// Total length once a response declared one; `-1` while unknown.
    pub(crate) file_length: i64,
    /// Backend base URL learned from the last connection, offset stripped.
    pub(crate) resolved_url: Option<Url>,
    /// Connection established but not yet adopted as the body.
    pub(crate) cached: Option<HttpConnection>,
    pub(crate) body: Option<Body>,
    pub(crate) exclude: ExcludeNodes,
    pub(crate) stats: ReadStatistics,
}

impl StreamCore {
    pub(crate) fn open(
        ctx: Arc<ClientContext>,
        path: &str,
        buffer_size: usize,
        read_param: Option<String>,
        stats: ReadStatistics,
    ) -> Result<Self, ClientError> {
        let mut core = StreamCore {
            ctx,
            path: path.to_string(),
            buffer_size: buffer_size.max(1),
            read_param,
            state: RunnerState::Seeking,
            pos: 0,
            file_length: -1,
            resolved_url: None,
            cached: None,
            body: None,
            exclude: ExcludeNodes::new(),
            stats,
        };
        core.resolve_base()?;
        Ok(core)
    }

    /// Learn the canonical backend URL once: a redirect response caches its
    /// Location with the offset parameter stripped; a direct response is
    /// kept and consumed by the first read.
    fn resolve_base(&mut self) -> Result<(), ClientError> {
        let principal = crate::auth::resolve_principal(self.ctx.credentials.as_ref());
        let url = urls::to_url(
            &self.ctx.base,
            Op::Open,
            &self.path,
            &principal,
            &[Param::BufferSize(self.buffer_size)],
            &self.exclude,
        )?;
        let mut probe = UrlRunner::new(
            self.ctx.as_ref(),
            url,
            Op::Open,
            false,
            false,
            self.read_param.as_deref(),
            self.exclude.clone(),
        );
        let conn = runner::run(&mut probe)?;
        let location = conn.location().map(str::to_string);
        match location {
            Some(loc) => {
                let resolved = Url::parse(&loc)
                    .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", loc, e)))?;
                tracing::debug!(url = %resolved, "resolved read target");
                self.resolved_url = Some(urls::strip_offset_param(&resolved));
            }
            None => {
                self.cached = Some(conn);
            }
        }
        Ok(())
    }

    /// Drop the body and any pending connection, entering `next`. Runs on
    /// every path that leaves `Open`, so the socket is released before the
    /// transition returns.
    pub(crate) fn close_connection(&mut self, next: RunnerState) {
        self.body = None;
        self.cached = None;
        self.state = next;
    }

    pub(crate) fn seek(&mut self, new_pos: u64) -> Result<(), ClientError> {
        if self.state == RunnerState::Closed {
            return Err(ClientError::StreamClosed);
        }
        if new_pos != self.pos {
            self.pos = new_pos;
            self.close_connection(RunnerState::Seeking);
        }
        Ok(())
    }

    pub(crate) fn close(&mut self) {
        self.close_connection(RunnerState::Closed);
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize, ClientError> {
        if self.state == RunnerState::Closed {
            return Err(ClientError::StreamClosed);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.state == RunnerState::Seeking {
            self.reopen_at_cursor();
        }

        let outcome = {
            let mut attempt = ReadAttempt {
                core: &mut *self,
                buf,
            };
            runner::run(&mut attempt)
        };
        match outcome {
            Ok(count) => {
                self.pos += count as u64;
                self.stats.increment_bytes_read(count as u64);
                Ok(count)
            }
            Err(e) => {
                if self.state != RunnerState::Closed {
                    self.close_connection(RunnerState::Disconnected);
                }
                Err(e)
            }
        }
    }

    /// Ranged reopen from the resolved backend URL at the current cursor.
    /// Failure is absorbed: the state moves to `Disconnected` and the same
    /// read call falls back to the full name-node path.
    fn reopen_at_cursor(&mut self) {
        if self.cached.is_some() {
            // Construction probe answered directly; consume that connection.
            return;
        }
        let base = match self.resolved_url.clone() {
            Some(base) => base,
            None => return,
        };
        let url = urls::with_offset(&base, self.pos);
        let mut reopen = UrlRunner::new(
            self.ctx.as_ref(),
            url,
            Op::Open,
            true,
            false,
            self.read_param.as_deref(),
            self.exclude.clone(),
        );
        match runner::run(&mut reopen) {
            Ok(conn) => self.cached = Some(conn),
            Err(e) => {
                tracing::debug!(error = %e, "ranged reopen failed; falling back to name-node path");
                self.close_connection(RunnerState::Disconnected);
            }
        }
    }

    /// One-time body setup for a fresh connection: remember the resolved
    /// base URL, bound the body when a length was declared (an unbounded
    /// read past an advertised length can hang until the server times out),
    /// and wrap it in the read buffer.
    fn adopt_connection(&mut self, conn: HttpConnection) {
        self.resolved_url = Some(urls::strip_offset_param(conn.url()));
        let declared = conn.content_length();
        let bounded = match declared {
            Some(len) => {
                self.file_length = (self.pos + len) as i64;
                conn.take(len)
            }
            None => {
                self.file_length = -1;
                conn.take(u64::MAX)
            }
        };
        self.body = Some(BufReader::with_capacity(self.buffer_size, bounded));
        self.state = RunnerState::Open;
    }
}

/// One read call routed through the generic runner: consumes any cached
/// connection, lazily initializes the body, copies into the caller buffer.
struct ReadAttempt<'a> {
    core: &'a mut StreamCore,
    buf: &'a mut [u8],
}

impl Runner for ReadAttempt<'_> {
    type Output = usize;

    fn op(&self) -> Op {
        Op::Open
    }

    fn read_param(&self) -> Option<&str> {
        self.core.read_param.as_deref()
    }

    fn context(&self) -> &ClientContext {
        self.core.ctx.as_ref()
    }

    fn exclude(&self) -> &ExcludeNodes {
        &self.core.exclude
    }

    fn connected(&self) -> bool {
        self.core.body.is_some()
    }

    fn take_cached(&mut self) -> Option<HttpConnection> {
        self.core.cached.take()
    }

    fn build_url(&mut self, principal: &str) -> Result<Url, ClientError> {
        // Full name-node path: offset and buffer size rebuilt from the
        // cursor, exclusions recomputed.
        urls::to_url(
            &self.core.ctx.base,
            Op::Open,
            &self.core.path,
            principal,
            &[
                Param::BufferSize(self.core.buffer_size),
                Param::Offset(self.core.pos),
            ],
            &self.core.exclude,
        )
    }

    fn accept_connection(&mut self, conn: HttpConnection) -> Result<(), ClientError> {
        self.core.adopt_connection(conn);
        Ok(())
    }

    fn produce(&mut self) -> Result<usize, ClientError> {
        let body = match self.core.body.as_mut() {
            Some(body) => body,
            None => {
                return Err(ClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "no open connection",
                )))
            }
        };
        match body.read(self.buf) {
            Ok(count) => Ok(count),
            Err(e) => {
                if let Some(url) = &self.core.resolved_url {
                    if let Some(host) = urls::authority(url) {
                        tracing::debug!(%host, "excluding data node after read failure");
                        self.core.exclude.record(host);
                    }
                }
                self.core.close_connection(RunnerState::Disconnected);
                Err(ClientError::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SimpleCredentials;
    use crate::config::ClientConfig;
    use crate::retry::RetryPolicy;

    fn offline_core() -> StreamCore {
        let ctx = ClientContext {
            base: Url::parse("http://127.0.0.1:1").unwrap(),
            config: ClientConfig::default(),
            policy: RetryPolicy::default(),
            credentials: Arc::new(SimpleCredentials::new("tester")),
        };
        StreamCore {
            ctx: Arc::new(ctx),
            path: "/f".to_string(),
            buffer_size: 4096,
            read_param: None,
            state: RunnerState::Seeking,
            pos: 0,
            file_length: -1,
            resolved_url: None,
            cached: None,
            body: None,
            exclude: ExcludeNodes::new(),
            stats: ReadStatistics::new(),
        }
    }

    #[test]
    fn empty_read_is_a_no_op_in_any_open_state() {
        let mut core = offline_core();
        assert_eq!(core.read(&mut []).unwrap(), 0);
        assert_eq!(core.state, RunnerState::Seeking);
        core.state = RunnerState::Disconnected;
        assert_eq!(core.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn read_after_close_fails_every_time() {
        let mut core = offline_core();
        core.close();
        let mut buf = [0u8; 8];
        assert!(matches!(
            core.read(&mut buf),
            Err(ClientError::StreamClosed)
        ));
        assert!(matches!(
            core.read(&mut buf),
            Err(ClientError::StreamClosed)
        ));
    }

    #[test]
    fn seek_to_same_position_keeps_state() {
        let mut core = offline_core();
        core.state = RunnerState::Open;
        core.pos = 512;
        core.seek(512).unwrap();
        assert_eq!(core.state, RunnerState::Open);
    }

    #[test]
    fn seek_to_new_position_tears_down() {
        let mut core = offline_core();
        core.state = RunnerState::Open;
        core.pos = 512;
        core.seek(1500).unwrap();
        assert_eq!(core.state, RunnerState::Seeking);
        assert_eq!(core.pos, 1500);
        assert!(core.body.is_none());
    }

    #[test]
    fn close_is_idempotent_and_terminal() {
        let mut core = offline_core();
        core.close();
        core.close();
        assert_eq!(core.state, RunnerState::Closed);
        assert!(matches!(core.seek(10), Err(ClientError::StreamClosed)));
    }
}
