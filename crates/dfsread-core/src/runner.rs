//! Generic request runner: URL building, two-hop redirect resolution,
//! bounded retry with credential refresh, response validation.

use std::sync::Arc;
use std::thread;

use serde::Deserialize;
use url::Url;

use crate::auth::{resolve_principal, CredentialProvider};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::exclude::ExcludeNodes;
use crate::http::{self, HttpConnection};
use crate::op::{Op, TEMPORARY_REDIRECT};
use crate::retry::{classify, ErrorKind, RetryDecision};

/// Error-envelope body limit; remote exceptions are small.
const ERROR_BODY_LIMIT: u64 = 64 * 1024;

/// Per-client context consulted by every request.
pub(crate) struct ClientContext {
    pub(crate) base: Url,
    pub(crate) config: ClientConfig,
    pub(crate) policy: crate::retry::RetryPolicy,
    pub(crate) credentials: Arc<dyn CredentialProvider>,
}

/// Capability interface for one logical request: how to rebuild its URL each
/// attempt, how to adopt the validated connection, and how to produce the
/// typed result.
pub(crate) trait Runner {
    type Output;

    fn op(&self) -> Op;

    /// True when the URL already points at the resolved backend, so no
    /// redirect hop is issued.
    fn redirected(&self) -> bool {
        false
    }

    /// False to stop after learning the redirect target; the first-hop
    /// response (with its `Location`) becomes the connection.
    fn follow_redirect(&self) -> bool {
        true
    }

    fn read_param(&self) -> Option<&str> {
        None
    }

    fn context(&self) -> &ClientContext;

    fn exclude(&self) -> &ExcludeNodes;

    /// True while a previously adopted connection is still usable, so this
    /// attempt needs no new connection.
    fn connected(&self) -> bool {
        false
    }

    /// Connection established out of band (seek reopen, construction probe),
    /// consumed in place of connecting anew.
    fn take_cached(&mut self) -> Option<HttpConnection> {
        None
    }

    /// Rebuild the request URL for the current attempt. The exclusion
    /// contribution is recomputed on every call.
    fn build_url(&mut self, principal: &str) -> Result<Url, ClientError>;

    /// Adopt a newly validated connection (lazy one-time setup).
    fn accept_connection(&mut self, conn: HttpConnection) -> Result<(), ClientError>;

    /// Produce the typed result from the adopted connection.
    fn produce(&mut self) -> Result<Self::Output, ClientError>;
}

/// Execute a runner: resolve the principal, refresh credentials when the
/// operation demands pre-authenticated access, then attempt with bounded
/// credential-refresh retries.
pub(crate) fn run<R: Runner>(runner: &mut R) -> Result<R::Output, ClientError> {
    let principal = resolve_principal(runner.context().credentials.as_ref());
    if runner.op().require_auth() {
        runner.context().credentials.check_and_refresh()?;
    }
    run_with_retry(runner, &principal)
}

fn run_with_retry<R: Runner>(runner: &mut R, principal: &str) -> Result<R::Output, ClientError> {
    let policy = runner.context().policy;
    let mut attempt = 1u32;
    loop {
        let err = match attempt_once(runner, principal) {
            Ok(output) => return Ok(output),
            Err(e) => e,
        };
        let kind = classify(&err);
        if kind != ErrorKind::Credential || runner.op().require_auth() {
            return Err(err);
        }
        match policy.decide(attempt, kind) {
            RetryDecision::RetryAfter(delay) => {
                tracing::debug!(attempt, "credential expired; refreshing and retrying");
                runner.context().credentials.check_and_refresh()?;
                thread::sleep(delay);
                attempt += 1;
            }
            RetryDecision::NoRetry => {
                return Err(ClientError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
        }
    }
}

fn attempt_once<R: Runner>(runner: &mut R, principal: &str) -> Result<R::Output, ClientError> {
    if !runner.connected() {
        let conn = match runner.take_cached() {
            Some(conn) => conn,
            None => {
                let url = runner.build_url(principal)?;
                connect(runner, url)?
            }
        };
        runner.accept_connection(conn)?;
    }
    runner.produce()
}

/// Two-hop connect: optional redirect resolution, then the real request.
/// A failure on the post-redirect hop records the redirect authority in the
/// exclusion set before propagating.
fn connect<R: Runner>(runner: &mut R, url: Url) -> Result<HttpConnection, ClientError> {
    let op = runner.op();
    let read_param = runner.read_param().map(str::to_string);
    let read_param = read_param.as_deref();

    let mut target = url;
    let mut redirect_host: Option<String> = None;

    if op.redirectable() && !runner.redirected() {
        let mut first = http::request(&target, op, read_param, &runner.context().config)?;
        if first.status() == op.expected_status() {
            // Backend answered directly; nothing to resolve.
            return Ok(first);
        }
        if first.status() != TEMPORARY_REDIRECT {
            return Err(error_from_response(&mut first));
        }
        let location = match first.location() {
            Some(loc) => loc.to_string(),
            None => return Err(ClientError::MissingRedirect(first.status())),
        };
        let resolved = Url::parse(&location)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", location, e)))?;
        redirect_host = crate::urls::authority(&resolved);
        if !runner.follow_redirect() {
            return Ok(first);
        }
        target = resolved;
    }

    let outcome = http::request(&target, op, read_param, &runner.context().config).and_then(
        |mut conn| {
            if conn.status() == op.expected_status() {
                Ok(conn)
            } else {
                Err(error_from_response(&mut conn))
            }
        },
    );
    match outcome {
        Ok(conn) => Ok(conn),
        Err(e) => {
            if let Some(host) = redirect_host {
                tracing::debug!(%host, "excluding data node after connect failure");
                runner.exclude().record(host);
            }
            Err(e)
        }
    }
}

/// Plain-connection runner: fixed URL, the validated connection is the
/// result.
pub(crate) struct UrlRunner<'a> {
    pub(crate) ctx: &'a ClientContext,
    pub(crate) url: Url,
    pub(crate) op: Op,
    pub(crate) redirected: bool,
    pub(crate) follow_redirect: bool,
    pub(crate) read_param: Option<&'a str>,
    pub(crate) exclude: ExcludeNodes,
    conn: Option<HttpConnection>,
}

impl<'a> UrlRunner<'a> {
    pub(crate) fn new(
        ctx: &'a ClientContext,
        url: Url,
        op: Op,
        redirected: bool,
        follow_redirect: bool,
        read_param: Option<&'a str>,
        exclude: ExcludeNodes,
    ) -> Self {
        Self {
            ctx,
            url,
            op,
            redirected,
            follow_redirect,
            read_param,
            exclude,
            conn: None,
        }
    }
}

impl Runner for UrlRunner<'_> {
    type Output = HttpConnection;

    fn op(&self) -> Op {
        self.op
    }

    fn redirected(&self) -> bool {
        self.redirected
    }

    fn follow_redirect(&self) -> bool {
        self.follow_redirect
    }

    fn read_param(&self) -> Option<&str> {
        self.read_param
    }

    fn context(&self) -> &ClientContext {
        self.ctx
    }

    fn exclude(&self) -> &ExcludeNodes {
        &self.exclude
    }

    fn build_url(&mut self, _principal: &str) -> Result<Url, ClientError> {
        Ok(self.url.clone())
    }

    fn accept_connection(&mut self, conn: HttpConnection) -> Result<(), ClientError> {
        self.conn = Some(conn);
        Ok(())
    }

    fn produce(&mut self) -> Result<HttpConnection, ClientError> {
        self.conn.take().ok_or_else(|| {
            ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no connection established",
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionEnvelope {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    #[serde(default)]
    message: Option<String>,
}

/// Decode a non-success response into a typed error, consuming the JSON
/// remote-exception envelope when one is present.
fn error_from_response(conn: &mut HttpConnection) -> ClientError {
    let code = conn.status();
    let body = conn.read_body_string(ERROR_BODY_LIMIT).unwrap_or_default();
    map_remote_exception(code, &body)
}

fn map_remote_exception(code: u32, body: &str) -> ClientError {
    if let Ok(envelope) = serde_json::from_str::<RemoteExceptionEnvelope>(body) {
        let remote = envelope.remote_exception;
        let message = remote.message.unwrap_or_else(|| remote.exception.clone());
        if remote.exception.contains("AccessControl") {
            return ClientError::AccessDenied(message);
        }
        if remote.exception.contains("InvalidToken") || remote.exception.contains("ExpiredToken") {
            return ClientError::CredentialExpired(message);
        }
        return ClientError::Http {
            code,
            message: Some(message),
        };
    }
    ClientError::Http {
        code,
        message: None,
    }
}
