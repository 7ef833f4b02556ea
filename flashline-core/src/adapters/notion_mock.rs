//! Mock Notion API server for testing
//!
//! Serves just enough of the Notion API for the client tests:
//! - GET /blocks/{id}/children returns paginated `{results, has_more, next_cursor}`
//! - GET /pages/{id} returns a page with a title property
//! - POST /oauth/token returns an access token

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::json;

/// The only page id the mock knows about
pub const MOCK_PAGE_ID: &str = "c1ede68fd209478ab1ac96f277a405e0";

/// Blocks returned per response, regardless of the requested page_size
const MOCK_PAGE_SIZE: usize = 2;

/// Mock Notion server for testing
pub struct MockNotionServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Number of child blocks on the mock page
    pub num_blocks: usize,
    /// Whether to simulate rate limiting
    pub rate_limit: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_blocks: 5,
            rate_limit: false,
        }
    }
}

impl MockNotionServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        // Non-blocking so the accept loop notices shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        thread::spawn(move || handle_connection(stream, &cfg));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockNotionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read the request head plus any body announced by Content-Length
fn read_request(stream: &mut TcpStream) -> String {
    let _ = stream.set_nonblocking(false);
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    loop {
        let n = match stream.read(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buffer[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let lower = line.to_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .and_then(|v| v.trim().parse::<usize>().ok())
                })
                .unwrap_or(0);
            if data.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig) {
    let request = read_request(&mut stream);

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"message": "Invalid request"}"#);
        return;
    }

    let method = parts[0];
    let path = parts[1];
    let (route, query) = path.split_once('?').unwrap_or((path, ""));

    if method == "POST" && route == "/oauth/token" {
        let body = json!({
            "access_token": "secret_from_oauth",
            "workspace_id": "ws-1",
            "workspace_name": "Mock Workspace",
            "bot_id": "bot-1"
        });
        send_response(&mut stream, 200, "OK", &body.to_string());
        return;
    }

    let request_lower = request.to_lowercase();
    let has_valid_auth = request_lower.contains("authorization: bearer secret_")
        || request_lower.contains("authorization: bearer ntn_");
    if !has_valid_auth {
        send_response(&mut stream, 401, "Unauthorized", r#"{"code": "unauthorized"}"#);
        return;
    }

    if config.rate_limit {
        send_response(&mut stream, 429, "Too Many Requests", r#"{"code": "rate_limited"}"#);
        return;
    }

    let segments: Vec<&str> = route.trim_start_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        ("GET", ["blocks", id, "children"]) if *id == MOCK_PAGE_ID => {
            let start = query
                .split('&')
                .find_map(|kv| kv.strip_prefix("start_cursor="))
                .and_then(|c| c.parse::<usize>().ok())
                .unwrap_or(0);
            let end = (start + MOCK_PAGE_SIZE).min(config.num_blocks);
            let results: Vec<_> = (start..end)
                .map(|i| {
                    json!({
                        "object": "block",
                        "id": format!("block-{}", i),
                        "type": "bulleted_list_item",
                        "bulleted_list_item": {
                            "rich_text": [{"plain_text": format!("🧩 Question {}::Answer {}", i, i)}]
                        }
                    })
                })
                .collect();
            let has_more = end < config.num_blocks;
            let next_cursor = if has_more { Some(end.to_string()) } else { None };
            let body = json!({
                "object": "list",
                "results": results,
                "has_more": has_more,
                "next_cursor": next_cursor,
            });
            send_response(&mut stream, 200, "OK", &body.to_string());
        }
        ("GET", ["pages", id]) if *id == MOCK_PAGE_ID => {
            let body = json!({
                "object": "page",
                "id": MOCK_PAGE_ID,
                "properties": {
                    "title": {"id": "title", "type": "title", "title": [{"plain_text": "Mock Page"}]}
                }
            });
            send_response(&mut stream, 200, "OK", &body.to_string());
        }
        _ => send_response(&mut stream, 404, "Not Found", r#"{"code": "object_not_found"}"#),
    }
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
