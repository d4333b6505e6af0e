//! Minimal name-node / data-node HTTP pair for integration tests.
//!
//! The name node answers `op=OPEN` with a 307 Location pointing at the data
//! node (echoing the request query) and `op=GETFILESTATUS` with a JSON
//! envelope; the data node serves the body from the `offset` query
//! parameter. Fault injection and a request log support the reconnect and
//! exclusion tests. Servers run until the test process exits.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Copy)]
pub struct DfsServerOptions {
    /// If false, the name node serves OPEN bodies directly (no redirect).
    pub redirect: bool,
    /// If false, body responses omit Content-Length (close-delimited).
    pub content_length: bool,
    /// Serve only this many body bytes on the first data response, then
    /// close short of the declared length.
    pub truncate_first_response_at: Option<usize>,
    /// Drop this many data-node connections without a response before
    /// serving normally.
    pub fail_first_data_requests: usize,
    /// Respond 401 InvalidToken to this many name-node requests first.
    pub auth_failures: usize,
    /// Respond 403 AccessControlException to every name-node request.
    pub deny_access: bool,
}

impl Default for DfsServerOptions {
    fn default() -> Self {
        Self {
            redirect: true,
            content_length: true,
            truncate_first_response_at: None,
            fail_first_data_requests: 0,
            auth_failures: 0,
            deny_access: false,
        }
    }
}

struct Shared {
    body: Vec<u8>,
    opts: DfsServerOptions,
    dn_port: u16,
    requests: Mutex<Vec<String>>,
    data_connections: AtomicUsize,
    data_failures_left: AtomicUsize,
    truncations_left: AtomicUsize,
    auth_failures_left: AtomicUsize,
}

pub struct DfsServer {
    shared: Arc<Shared>,
    /// Name-node base URL, e.g. `http://127.0.0.1:12345`.
    pub base_url: String,
    /// `host:port` identity of the data node.
    pub data_authority: String,
}

impl DfsServer {
    /// All request targets seen so far, prefixed `NN ` or `DN `.
    pub fn requests(&self) -> Vec<String> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn namenode_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with("NN "))
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }

    /// Number of connections the data node has accepted.
    pub fn data_connections(&self) -> usize {
        self.shared.data_connections.load(Ordering::SeqCst)
    }
}

pub fn start(body: Vec<u8>) -> DfsServer {
    start_with_options(body, DfsServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: DfsServerOptions) -> DfsServer {
    let nn_listener = TcpListener::bind("127.0.0.1:0").expect("bind name node");
    let dn_listener = TcpListener::bind("127.0.0.1:0").expect("bind data node");
    let nn_port = nn_listener.local_addr().unwrap().port();
    let dn_port = dn_listener.local_addr().unwrap().port();

    let shared = Arc::new(Shared {
        body,
        opts,
        dn_port,
        requests: Mutex::new(Vec::new()),
        data_connections: AtomicUsize::new(0),
        data_failures_left: AtomicUsize::new(opts.fail_first_data_requests),
        truncations_left: AtomicUsize::new(usize::from(
            opts.truncate_first_response_at.is_some(),
        )),
        auth_failures_left: AtomicUsize::new(opts.auth_failures),
    });

    {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in nn_listener.incoming().flatten() {
                let shared = Arc::clone(&shared);
                thread::spawn(move || handle_namenode(stream, &shared));
            }
        });
    }
    {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in dn_listener.incoming().flatten() {
                let shared = Arc::clone(&shared);
                thread::spawn(move || handle_datanode(stream, &shared));
            }
        });
    }

    DfsServer {
        shared,
        base_url: format!("http://127.0.0.1:{}", nn_port),
        data_authority: format!("127.0.0.1:{}", dn_port),
    }
}

/// Returns the request target ("/path?query") of an HTTP request, or None.
fn read_target(stream: &mut TcpStream) -> Option<String> {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return None,
        Ok(n) => n,
    };
    let request = std::str::from_utf8(&buf[..n]).ok()?;
    let line = request.lines().next()?;
    line.split_whitespace().nth(1).map(str::to_string)
}

fn query_param(target: &str, name: &str) -> Option<String> {
    let query = target.split_once('?')?.1;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn counter_take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn write_json(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn handle_namenode(mut stream: TcpStream, shared: &Shared) {
    let target = match read_target(&mut stream) {
        Some(t) => t,
        None => return,
    };
    shared
        .requests
        .lock()
        .unwrap()
        .push(format!("NN {}", target));

    if shared.opts.deny_access {
        write_json(
            &mut stream,
            "403 Forbidden",
            r#"{"RemoteException":{"exception":"AccessControlException","javaClassName":"org.apache.hadoop.security.AccessControlException","message":"Permission denied: user=tester, access=READ"}}"#,
        );
        return;
    }
    if counter_take(&shared.auth_failures_left) {
        write_json(
            &mut stream,
            "401 Unauthorized",
            r#"{"RemoteException":{"exception":"InvalidToken","javaClassName":"org.apache.hadoop.security.token.SecretManager$InvalidToken","message":"token is expired"}}"#,
        );
        return;
    }

    match query_param(&target, "op").as_deref() {
        Some("GETFILESTATUS") => {
            let body = format!(
                r#"{{"FileStatus":{{"accessTime":0,"blockSize":134217728,"group":"supergroup","length":{},"modificationTime":0,"owner":"tester","pathSuffix":"","permission":"644","replication":3,"type":"FILE"}}}}"#,
                shared.body.len()
            );
            write_json(&mut stream, "200 OK", &body);
        }
        Some("OPEN") => {
            if shared.opts.redirect {
                let location = format!("http://127.0.0.1:{}{}", shared.dn_port, target);
                let response = format!(
                    "HTTP/1.1 307 Temporary Redirect\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    location
                );
                let _ = stream.write_all(response.as_bytes());
            } else {
                serve_body(&mut stream, shared, &target);
            }
        }
        _ => {
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
    }
}

fn handle_datanode(mut stream: TcpStream, shared: &Shared) {
    shared.data_connections.fetch_add(1, Ordering::SeqCst);
    let target = match read_target(&mut stream) {
        Some(t) => t,
        None => return,
    };
    shared
        .requests
        .lock()
        .unwrap()
        .push(format!("DN {}", target));

    if counter_take(&shared.data_failures_left) {
        // Close without a response; the client sees a transport failure.
        return;
    }
    serve_body(&mut stream, shared, &target);
}

fn serve_body(stream: &mut TcpStream, shared: &Shared, target: &str) {
    let total = shared.body.len();
    let offset = query_param(target, "offset")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
        .min(total);
    let slice = &shared.body[offset..];

    let content_length = if shared.opts.content_length {
        format!("Content-Length: {}\r\n", slice.len())
    } else {
        String::new()
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\n{}Connection: close\r\n\r\n",
        content_length
    );
    let _ = stream.write_all(response.as_bytes());

    if let Some(limit) = shared.opts.truncate_first_response_at {
        if counter_take(&shared.truncations_left) {
            // Declared the full length above but send only a prefix, then
            // close; the client hits a mid-body transport failure.
            let cut = limit.min(slice.len());
            let _ = stream.write_all(&slice[..cut]);
            let _ = stream.flush();
            return;
        }
    }
    let _ = stream.write_all(slice);
}
