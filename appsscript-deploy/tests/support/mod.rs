#![allow(dead_code)]
//! Minimal HTTP/1.1 server for integration tests: answers canned JSON responses by
//! method and path prefix, and records every request it receives.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_key.pub.pem");

#[derive(Clone)]
pub struct Route {
    pub method: &'static str,
    pub path_prefix: String,
    pub status: u16,
    pub body: String,
}

impl Route {
    pub fn new(method: &'static str, path_prefix: &str, status: u16, body: &str) -> Self {
        Self {
            method,
            path_prefix: path_prefix.to_string(),
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body should be JSON")
    }
}

pub struct FakeServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeServer {
    pub fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                handle(stream, &routes, &recorded);
            }
        });
        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn token_uri(&self) -> String {
        format!("{}/token", self.base_url)
    }
}

fn handle(mut stream: TcpStream, routes: &[Route], recorded: &Mutex<Vec<RecordedRequest>>) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let route = routes
        .iter()
        .find(|r| r.method == request.method && request.path.starts_with(&r.path_prefix));
    let (status, body) = match route {
        Some(route) => (route.status, route.body.clone()),
        None => (
            404,
            r#"{"error":{"code":404,"message":"no route in test server","status":"NOT_FOUND"}}"#
                .to_string(),
        ),
    };
    recorded.lock().unwrap().push(request);
    let response = format!(
        "HTTP/1.1 {status} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buffer[header_end..]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Service account key JSON signed with the test fixture key, pointed at `token_uri`.
pub fn service_account_json(token_uri: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "demo-project",
        "private_key_id": "test-kid",
        "private_key": TEST_PRIVATE_KEY,
        "client_email": "deployer@demo-project.iam.gserviceaccount.com",
        "token_uri": token_uri,
    })
    .to_string()
}

pub const TOKEN_RESPONSE: &str =
    r#"{"access_token":"test-access-token","expires_in":3599,"token_type":"Bearer"}"#;
