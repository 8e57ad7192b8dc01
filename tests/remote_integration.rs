//! Purpose: End-to-end tests for the query round trip over real TCP.
//! Exports: None (integration test module).
//! Role: Validate request shaping, status classification, and response binding.
//! Invariants: Stub server is loopback-only and answers exactly the scripted exchanges.
//! Invariants: Bounded reads and receive timeouts avoid test flakiness.

use helix_client::{Client, ErrorKind, QueryInput, ScanDest};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

const USERS_BODY: &str = r#"{"users":[{"id":"1","name":"Al"}],"count":1}"#;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct User {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct NewUser {
    name: String,
    age: i32,
}

/// One HTTP request as the stub server saw it.
struct CapturedRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Loopback stub that serves scripted responses, one connection per entry,
/// and hands each captured request back to the test.
struct StubServer {
    base_url: String,
    requests: mpsc::Receiver<CapturedRequest>,
}

impl StubServer {
    fn start(responses: Vec<String>) -> TestResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let (sender, requests) = mpsc::channel();
        thread::spawn(move || {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let Ok(request) = read_request(&mut stream) else {
                    return;
                };
                let _ = sender.send(request);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        Ok(Self {
            base_url: format!("http://{addr}"),
            requests,
        })
    }

    fn take_request(&self) -> TestResult<CapturedRequest> {
        Ok(self.requests.recv_timeout(Duration::from_secs(5))?)
    }
}

fn http_response(status: u16, reason: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn json_ok(body: &str) -> String {
    http_response(200, "OK", "application/json", body)
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split(' ');
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }

    Ok(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

fn refused_base_url() -> TestResult<String> {
    // Bind then drop so the port is known to refuse connections.
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

#[test]
fn query_round_trip_binds_fields() -> TestResult<()> {
    let server = StubServer::start(vec![json_ok(USERS_BODY)])?;
    let client = Client::new(server.base_url.clone())?;

    let response = client.query("get_users", QueryInput::Empty)?;
    let mut users: Vec<User> = Vec::new();
    let mut count = 0u32;
    response.scan(&mut [
        ScanDest::field("users", &mut users),
        ScanDest::field("count", &mut count),
    ])?;
    assert_eq!(users[0].name, "Al");
    assert_eq!(count, 1);
    assert_eq!(response.raw(), USERS_BODY.as_bytes());

    let request = server.take_request()?;
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/get_users");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_eq!(request.body, b"{}");
    Ok(())
}

#[test]
fn query_sends_encoded_record_input() -> TestResult<()> {
    let server = StubServer::start(vec![json_ok(r#"{"user":{"id":"9"}}"#)])?;
    let client = Client::new(server.base_url.clone())?;

    let input = QueryInput::data(&NewUser {
        name: "John Doe".to_string(),
        age: 25,
    })?;
    let response = client.query("create_user", input)?;
    let map = response.as_map()?;
    assert_eq!(map["user"]["id"], json!("9"));

    let request = server.take_request()?;
    assert_eq!(request.path, "/create_user");
    let sent: Value = serde_json::from_slice(&request.body)?;
    assert_eq!(sent, json!({"name": "John Doe", "age": 25}));
    Ok(())
}

#[test]
fn query_appends_endpoint_under_base_path() -> TestResult<()> {
    let server = StubServer::start(vec![json_ok("{}")])?;
    let client = Client::new(format!("{}/helix", server.base_url))?;

    client.query("get_users", QueryInput::Empty)?;
    let request = server.take_request()?;
    assert_eq!(request.path, "/helix/get_users");
    Ok(())
}

#[test]
fn error_status_carries_code_and_body() -> TestResult<()> {
    let server = StubServer::start(vec![http_response(404, "Not Found", "text/plain", "not found")])?;
    let client = Client::new(server.base_url.clone())?;

    let err = client
        .query("get_users", QueryInput::Empty)
        .expect_err("status error");
    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.endpoint(), Some("get_users"));
    let rendered = err.to_string();
    assert!(rendered.contains("404"), "message must carry the code: {rendered}");
    assert!(rendered.contains("not found"), "message must carry the body: {rendered}");
    Ok(())
}

#[test]
fn success_range_boundaries() -> TestResult<()> {
    let server = StubServer::start(vec![
        http_response(299, "Custom", "application/json", "{}"),
        http_response(300, "Multiple Choices", "application/json", "{}"),
    ])?;
    let client = Client::new(server.base_url.clone())?;

    let response = client.query("edge", QueryInput::Empty)?;
    assert_eq!(response.raw(), b"{}");
    server.take_request()?;

    let err = client
        .query("edge", QueryInput::Empty)
        .expect_err("300 is outside the success range");
    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(err.status(), Some(300));
    Ok(())
}

#[test]
fn server_error_body_is_preserved() -> TestResult<()> {
    let body = r#"{"error":"traversal failed"}"#;
    let server = StubServer::start(vec![http_response(
        500,
        "Internal Server Error",
        "application/json",
        body,
    )])?;
    let client = Client::new(server.base_url.clone())?;

    let err = client
        .query("bad_query", QueryInput::Empty)
        .expect_err("server error");
    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("traversal failed"));
    Ok(())
}

#[test]
fn connection_refused_is_a_transport_error() -> TestResult<()> {
    let client = Client::new(refused_base_url()?)?;
    let err = client
        .query("get_users", QueryInput::Empty)
        .expect_err("transport error");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.endpoint(), Some("get_users"));
    Ok(())
}

#[test]
fn encode_failure_skips_the_round_trip() -> TestResult<()> {
    // A refused port would turn any attempted request into a Transport error,
    // so the UnsupportedShape kind proves encoding failed first.
    let client = Client::new(refused_base_url()?)?;
    let err = client
        .query("create_users", QueryInput::from(json!([1, 2])))
        .expect_err("encode error");
    assert_eq!(err.kind(), ErrorKind::UnsupportedShape);
    assert_eq!(err.endpoint(), Some("create_users"));
    Ok(())
}

#[test]
fn whole_document_scan_over_the_wire() -> TestResult<()> {
    #[derive(Debug, Default, Deserialize)]
    struct UserPage {
        users: Vec<User>,
        count: u32,
    }

    let server = StubServer::start(vec![json_ok(USERS_BODY)])?;
    let client = Client::new(server.base_url.clone())?;

    let mut page = UserPage::default();
    client
        .query("get_users", QueryInput::Empty)?
        .scan_into(&mut page)?;
    assert_eq!(page.users[0].id, "1");
    assert_eq!(page.count, 1);
    Ok(())
}
