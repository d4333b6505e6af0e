//! curl Handler for one pull-based transfer: collects response headers and
//! buffers body bytes until the consumer drains them.

use std::collections::VecDeque;
use std::str;

use curl::easy::{Handler, WriteError};

/// Body bytes kept buffered before the transfer is paused.
pub(super) const MAX_BUFFERED: usize = 256 * 1024;

pub(super) struct TransferHandler {
    pub(super) status_line: Option<String>,
    pub(super) headers: Vec<String>,
    pub(super) headers_complete: bool,
    pub(super) body: VecDeque<u8>,
    pub(super) paused: bool,
}

impl TransferHandler {
    pub(super) fn new() -> Self {
        Self {
            status_line: None,
            headers: Vec::new(),
            headers_complete: false,
            body: VecDeque::new(),
            paused: false,
        }
    }
}

impl Handler for TransferHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                // New status line: anything collected so far belonged to an
                // intermediate response.
                self.status_line = Some(line.to_string());
                self.headers.clear();
                self.headers_complete = false;
            } else if line.is_empty() {
                if self.status_line.is_some() {
                    self.headers_complete = true;
                }
            } else {
                self.headers.push(line.to_string());
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.body.len() >= MAX_BUFFERED {
            self.paused = true;
            return Err(WriteError::Pause);
        }
        self.body.extend(data);
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_clear_on_new_status_line() {
        let mut h = TransferHandler::new();
        h.header(b"HTTP/1.1 307 Temporary Redirect\r\n");
        h.header(b"Location: http://dn:9864/\r\n");
        h.header(b"\r\n");
        assert!(h.headers_complete);
        assert_eq!(h.headers.len(), 1);

        h.header(b"HTTP/1.1 200 OK\r\n");
        assert!(!h.headers_complete, "new response resets completion");
        assert!(h.headers.is_empty(), "headers cleared on new HTTP/ line");
        h.header(b"Content-Length: 10\r\n");
        h.header(b"\r\n");
        assert!(h.headers_complete);
    }

    #[test]
    fn blank_line_before_status_is_ignored() {
        let mut h = TransferHandler::new();
        h.header(b"\r\n");
        assert!(!h.headers_complete);
    }

    #[test]
    fn write_buffers_until_cap_then_pauses() {
        let mut h = TransferHandler::new();
        let n = h.write(b"abcd").unwrap();
        assert_eq!(n, 4);
        assert_eq!(h.body.len(), 4);

        h.body.extend(std::iter::repeat(0u8).take(MAX_BUFFERED));
        let res = h.write(b"more");
        assert!(matches!(res, Err(WriteError::Pause)));
        assert!(h.paused);
    }
}
