//! Minimal HTTP/1.1 server that plays back scripted replies per path for integration tests.
//!
//! Each path has a sequence of replies; the n-th request to a path gets the
//! n-th reply, and the last reply repeats once the script runs out. Unknown
//! paths get 404. Every response closes the connection. Request counts per
//! path are recorded so tests can assert how many attempts a fetch made.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    /// Empty response with this status.
    Status(u16),
    /// 200 with this body.
    Body(Vec<u8>),
    /// 200 advertising `advertised` bytes but sending only `body`, then closing.
    Truncated { advertised: usize, body: Vec<u8> },
    /// Reads the request, sends nothing for this long, then closes.
    Stall(Duration),
}

type Script = HashMap<String, Vec<Reply>>;

pub struct ArchiveServer {
    base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl ArchiveServer {
    /// Starts a server in a background thread. It runs until the process exits.
    pub fn start<I, P>(routes: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<Reply>)>,
        P: Into<String>,
    {
        let script: Arc<Script> = Arc::new(routes.into_iter().map(|(p, r)| (p.into(), r)).collect());
        let hits: Arc<Mutex<HashMap<String, usize>>> = Arc::new(Mutex::new(HashMap::new()));
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let hits_srv = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let script = Arc::clone(&script);
                let hits = Arc::clone(&hits_srv);
                thread::spawn(move || handle(stream, &script, &hits));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            hits,
        }
    }

    /// Base URL without trailing slash, e.g. `http://127.0.0.1:12345`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests received for `path` (e.g. `/n01.tar`).
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

fn handle(mut stream: TcpStream, script: &Script, hits: &Mutex<HashMap<String, usize>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let path = request_path(&request).to_string();
    let n = {
        let mut hits = hits.lock().unwrap();
        let n = hits.entry(path.clone()).or_insert(0);
        *n += 1;
        *n
    };
    let reply = match script.get(&path) {
        Some(replies) if !replies.is_empty() => replies[(n - 1).min(replies.len() - 1)].clone(),
        _ => Reply::Status(404),
    };
    match reply {
        Reply::Status(code) => {
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                code,
                reason(code)
            );
            let _ = stream.write_all(head.as_bytes());
        }
        Reply::Body(body) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/x-tar\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        }
        Reply::Truncated { advertised, body } => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                advertised
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        }
        Reply::Stall(pause) => thread::sleep(pause),
    }
    let _ = stream.flush();
    let _ = stream.shutdown(std::net::Shutdown::Both);
}

/// Reads until the end of the request head. Requests here never carry a body.
fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8(data).ok()
}

fn request_path(request: &str) -> &str {
    request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Status",
    }
}
