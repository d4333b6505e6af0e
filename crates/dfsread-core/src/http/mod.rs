//! HTTP connection layer: one curl transfer driven by a private multi
//! handle, exposing response metadata and a blocking, pull-based body.
//!
//! Redirect resolution is protocol logic in the runner; transfers here never
//! follow `Location` themselves.

mod handler;
mod parse;

use std::io::{self, Read};
use std::time::Duration;

use curl::multi::{Easy2Handle, Multi};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::op::Op;

use handler::TransferHandler;

/// Encryption-zone aware read marker, sent on every request.
const EZ_HEADER: &str = "X-Hadoop-Accept-EZ";
/// Opaque read-mode string supplied by the caller at open time.
const READ_PARAM_HEADER: &str = "ReadParam";

/// Wait slice for the multi loop while no data is ready.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// One in-flight HTTP exchange: response metadata plus a pull-based body.
///
/// Dropping the connection removes the transfer from the multi handle and
/// closes the socket, so every teardown path releases the connection.
pub struct HttpConnection {
    multi: Multi,
    handle: Option<Easy2Handle<TransferHandler>>,
    finished: Option<Result<(), curl::Error>>,
    status: u32,
    headers: Vec<String>,
    request_url: Url,
}

/// Issue `op` against `url` and block until response headers are complete.
pub fn request(
    url: &Url,
    op: Op,
    read_param: Option<&str>,
    config: &ClientConfig,
) -> Result<HttpConnection, ClientError> {
    let mut easy = curl::easy::Easy2::new(TransferHandler::new());
    easy.url(url.as_str())?;
    if op.method() == "GET" {
        easy.get(true)?;
    } else {
        easy.custom_request(op.method())?;
    }
    easy.follow_location(false)?;
    easy.connect_timeout(Duration::from_secs(config.connect_timeout_secs))?;

    let mut list = curl::easy::List::new();
    list.append(&format!("{}: true", EZ_HEADER))?;
    if let Some(value) = read_param {
        list.append(&format!("{}: {}", READ_PARAM_HEADER, value))?;
    }
    easy.http_headers(list)?;

    let multi = Multi::new();
    let handle = multi.add2(easy)?;

    let mut conn = HttpConnection {
        multi,
        handle: Some(handle),
        finished: None,
        status: 0,
        headers: Vec::new(),
        request_url: url.clone(),
    };
    conn.wait_for_headers()?;
    Ok(conn)
}

impl HttpConnection {
    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        parse::header_value(&self.headers, name)
    }

    pub fn content_length(&self) -> Option<u64> {
        parse::content_length(&self.headers)
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// The URL this connection was opened against.
    pub fn url(&self) -> &Url {
        &self.request_url
    }

    /// Drain the remaining body into a string, bounded by `limit` bytes.
    /// Used for small error envelopes.
    pub fn read_body_string(&mut self, limit: u64) -> Result<String, ClientError> {
        let mut data = Vec::new();
        let mut chunk = [0u8; 8192];
        while (data.len() as u64) < limit {
            let n = self.read(&mut chunk).map_err(ClientError::Io)?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
        }
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Block until response headers are complete, then capture status and
    /// header lines. Fails when the transfer dies first.
    fn wait_for_headers(&mut self) -> Result<(), ClientError> {
        loop {
            let running = self.pump()?;
            if self.headers_complete() || self.finished.is_some() {
                break;
            }
            if running == 0 {
                // No running transfer and no completion message; nothing
                // more will arrive.
                self.finished = Some(Ok(()));
                break;
            }
            self.wait()?;
        }

        if !self.headers_complete() {
            return match self.finished.take() {
                Some(Err(e)) => Err(ClientError::Curl(e)),
                _ => Err(ClientError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before response headers",
                ))),
            };
        }

        if let Some(handle) = self.handle.as_ref() {
            let handler = handle.get_ref();
            self.status =
                parse::parse_status_line(handler.status_line.as_deref().unwrap_or(""))
                    .unwrap_or(0);
            self.headers = handler.headers.clone();
        }
        Ok(())
    }

    fn headers_complete(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| h.get_ref().headers_complete)
            .unwrap_or(false)
    }

    /// One multi cycle: unpause a paused transfer, perform, drain completion
    /// messages. Returns the number of running transfers.
    fn pump(&mut self) -> Result<u32, ClientError> {
        if let Some(handle) = self.handle.as_mut() {
            if handle.get_ref().paused {
                handle.get_mut().paused = false;
                handle.unpause_write()?;
            }
        }
        let running = self.multi.perform()?;
        if self.finished.is_none() {
            if let Some(handle) = self.handle.as_ref() {
                let mut finished = None;
                self.multi.messages(|msg| {
                    if let Some(result) = msg.result_for2(handle) {
                        finished = Some(result);
                    }
                });
                self.finished = finished;
            }
        }
        Ok(running)
    }

    fn wait(&mut self) -> Result<(), ClientError> {
        self.multi.wait(&mut [], WAIT_SLICE)?;
        Ok(())
    }

    fn buffered(&self) -> usize {
        self.handle
            .as_ref()
            .map(|h| h.get_ref().body.len())
            .unwrap_or(0)
    }
}

impl Read for HttpConnection {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            if self.buffered() > 0 {
                let handler = match self.handle.as_mut() {
                    Some(h) => h.get_mut(),
                    None => return Ok(0),
                };
                let n = out.len().min(handler.body.len());
                for (slot, byte) in out.iter_mut().zip(handler.body.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
            match &self.finished {
                Some(Ok(())) => return Ok(0),
                Some(Err(e)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("transfer failed: {}", e),
                    ))
                }
                None => {
                    let running = self.pump().map_err(io::Error::from)?;
                    if self.buffered() == 0 && self.finished.is_none() {
                        if running == 0 {
                            self.finished = Some(Ok(()));
                        } else {
                            self.wait().map_err(io::Error::from)?;
                        }
                    }
                }
            }
        }
    }
}

impl Drop for HttpConnection {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.multi.remove2(handle);
        }
    }
}
