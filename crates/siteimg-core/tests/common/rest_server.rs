//! Minimal HTTP/1.1 fixture emulating the hosted store for integration tests.
//!
//! Serves the override table under `/rest/v1/site_images` (GET with optional
//! `slot_key=eq.X` filter, POST upsert) and the object store under
//! `/storage/v1/object/{bucket}/...`. State is shared with the test so rows
//! and stored objects can be inspected and failure injected.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Row {
    pub slot_key: String,
    pub image_url: String,
    pub label: Option<String>,
    pub section: Option<String>,
}

#[derive(Default)]
pub struct ServerState {
    pub rows: Mutex<Vec<Row>>,
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    /// When set, every request returns HTTP 500.
    pub fail: AtomicBool,
}

impl ServerState {
    pub fn set_row(&self, slot_key: &str, image_url: &str) {
        upsert(&mut self.rows.lock().unwrap(), Row {
            slot_key: slot_key.to_string(),
            image_url: image_url.to_string(),
            label: None,
            section: None,
        });
    }

    pub fn row_url(&self, slot_key: &str) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.slot_key == slot_key)
            .map(|r| r.image_url.clone())
    }
}

/// Starts the fixture in a background thread. Returns the base URL and the
/// shared state handle. The server runs until the process exits.
pub fn start() -> (String, Arc<ServerState>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(ServerState::default());
    let state2 = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&state2);
            thread::spawn(move || handle(stream, &state));
        }
    });
    (format!("http://127.0.0.1:{}", port), state)
}

fn handle(mut stream: TcpStream, state: &ServerState) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));

    let (method, target, body) = match read_request(&mut stream) {
        Some(parts) => parts,
        None => return,
    };

    if state.fail.load(Ordering::SeqCst) {
        respond(&mut stream, 500, "application/json", b"{\"error\":\"boom\"}");
        return;
    }

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target.as_str(), ""),
    };

    if path == "/rest/v1/site_images" && method == "GET" {
        let filter = query_param(query, "slot_key").and_then(|v| v.strip_prefix("eq.").map(String::from));
        let rows = state.rows.lock().unwrap();
        let selected: Vec<String> = rows
            .iter()
            .filter(|r| filter.as_deref().map_or(true, |k| r.slot_key == k))
            .map(row_json)
            .collect();
        let body = format!("[{}]", selected.join(","));
        respond(&mut stream, 200, "application/json", body.as_bytes());
    } else if path == "/rest/v1/site_images" && method == "POST" {
        let parsed: Vec<serde_json::Value> = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => {
                respond(&mut stream, 400, "application/json", b"{\"error\":\"bad body\"}");
                return;
            }
        };
        let mut rows = state.rows.lock().unwrap();
        for item in parsed {
            upsert(&mut rows, Row {
                slot_key: item["slot_key"].as_str().unwrap_or("").to_string(),
                image_url: item["image_url"].as_str().unwrap_or("").to_string(),
                label: item["label"].as_str().map(String::from),
                section: item["section"].as_str().map(String::from),
            });
        }
        respond(&mut stream, 201, "application/json", b"");
    } else if let Some(rest) = path.strip_prefix("/storage/v1/object/") {
        if method == "POST" {
            // rest = "{bucket}/{object_path...}"
            let object_path = rest.split_once('/').map(|(_, p)| p).unwrap_or(rest);
            state
                .objects
                .lock()
                .unwrap()
                .insert(object_path.to_string(), body);
            let reply = format!("{{\"Key\":\"{}\"}}", rest);
            respond(&mut stream, 200, "application/json", reply.as_bytes());
        } else {
            respond(&mut stream, 405, "application/json", b"");
        }
    } else {
        respond(&mut stream, 404, "application/json", b"{\"error\":\"not found\"}");
    }
}

fn row_json(row: &Row) -> String {
    let mut obj = serde_json::json!({
        "slot_key": row.slot_key,
        "image_url": row.image_url,
    });
    if let Some(label) = &row.label {
        obj["label"] = serde_json::Value::from(label.as_str());
    }
    if let Some(section) = &row.section {
        obj["section"] = serde_json::Value::from(section.as_str());
    }
    obj.to_string()
}

fn upsert(rows: &mut Vec<Row>, row: Row) {
    match rows.iter_mut().find(|r| r.slot_key == row.slot_key) {
        Some(existing) => {
            existing.image_url = row.image_url;
            if row.label.is_some() {
                existing.label = row.label;
            }
            if row.section.is_some() {
                existing.section = row.section;
            }
        }
        None => rows.push(row),
    }
}

/// Reads one request: the request line, headers (only Content-Length is
/// used), then exactly Content-Length body bytes.
fn read_request(stream: &mut TcpStream) -> Option<(String, String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    };

    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);
    Some((method, target, body))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

fn respond(stream: &mut TcpStream, status: u16, content_type: &str, body: &[u8]) {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}
