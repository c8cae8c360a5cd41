//! HTTP API for the chat UI
//!
//! Uses tokio directly (no web framework): one task per connection, a bounded
//! read, route, write a JSON response, close.

use crate::error::AssistantError;
use crate::models::{Metadata, Platform};
use crate::service::MessageService;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_BYTES: usize = 1_000_000;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self { status, body },
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                Self {
                    status: 500,
                    body: r#"{"error":"Failed to serialize response"}"#.to_string(),
                }
            }
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorResponse {
                error: message.into(),
                metadata: None,
            },
        )
    }

    /// Validation and storage errors report their own text. Resolver failures
    /// report the user-facing terminal answer; the raw cause is only logged.
    fn from_error(err: &AssistantError) -> Self {
        let body = match err {
            AssistantError::Validation(_) | AssistantError::Storage(_) => ErrorResponse {
                error: err.to_string(),
                metadata: None,
            },
            _ => {
                let terminal = err.terminal_resolution();
                ErrorResponse {
                    error: terminal.answer,
                    metadata: Some(terminal.metadata),
                }
            }
        };
        Self::json(err.status_code(), &body)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Connection: close\r\n\
             Content-Length: {}\r\n\
             \r\n\
             {}",
            self.status,
            status_text(self.status),
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Parse a complete raw HTTP/1.1 request.
pub fn parse_request(raw: &str) -> Option<HttpRequest> {
    let (head, body) = match raw.split_once("\r\n\r\n") {
        Some((head, body)) => (head, body),
        None => (raw, ""),
    };

    let mut lines = head.lines();
    let mut parts = lines.next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, HashMap::new()),
    };

    // Normalize path (remove trailing slash except for root)
    let mut path = path.trim_end_matches('/').to_string();
    if path.is_empty() {
        path = "/".to_string();
    }

    Some(HttpRequest {
        method,
        path,
        query,
        body: body.to_string(),
    })
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k.to_string(), url_decode(v)))
        })
        .collect()
}

/// Form-style decoding: `+` is a space, `%XX` is a byte. Invalid escapes are
/// kept as written.
fn url_decode(s: &str) -> String {
    let plus_decoded = s.replace('+', " ");
    let bytes = urlencoding::decode_binary(plus_decoded.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

fn content_length(head: &str) -> Option<usize> {
    head.lines()
        .find(|line| line.to_lowercase().starts_with("content-length:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|value| value.trim().parse().ok())
}

/// Dispatch one request.
pub async fn route(service: &MessageService, request: &HttpRequest) -> HttpResponse {
    debug!(method = %request.method, path = %request.path, "Request");

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/api/health") => HttpResponse::json(
            200,
            &HealthResponse {
                status: "ok",
                service: "cdp-assistant",
                version: env!("CARGO_PKG_VERSION"),
            },
        ),
        ("GET", "/api/messages") => {
            let platform = match request.query.get("platform").filter(|p| !p.is_empty()) {
                Some(raw) => match Platform::parse(raw) {
                    Some(platform) => Some(platform),
                    None => return HttpResponse::error(400, format!("Unknown platform: {}", raw)),
                },
                None => None,
            };
            match service.list(platform).await {
                Ok(messages) => HttpResponse::json(200, &messages),
                Err(e) => {
                    error!("Failed to list messages: {}", e);
                    HttpResponse::error(500, e.to_string())
                }
            }
        }
        ("POST", "/api/messages") => {
            let body: serde_json::Value = match serde_json::from_str(&request.body) {
                Ok(body) => body,
                Err(e) => return HttpResponse::error(400, format!("Invalid JSON body: {}", e)),
            };
            match service.submit(&body).await {
                Ok(message) => HttpResponse::json(200, &message),
                Err(e) => {
                    warn!("Question rejected: {}", e);
                    HttpResponse::from_error(&e)
                }
            }
        }
        ("OPTIONS", _) => HttpResponse {
            status: 200,
            body: String::new(),
        },
        (method, path) => HttpResponse::error(404, format!("Not found: {} {}", method, path)),
    }
}

/// Accept connections forever, one task each.
pub async fn serve(listener: TcpListener, service: Arc<MessageService>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Server listening on {}", addr);
    }

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, service).await {
                error!("Error handling connection from {}: {}", addr, e);
            }
        });
    }
}

enum ReadOutcome {
    Complete,
    TooLarge,
}

async fn handle_connection(
    mut stream: TcpStream,
    service: Arc<MessageService>,
) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    let read_result = timeout(READ_TIMEOUT, async {
        loop {
            let n = stream.read(&mut temp_buf).await?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&temp_buf[..n]);

            if let Some(headers_end) = find_headers_end(&buffer) {
                let head = String::from_utf8_lossy(&buffer[..headers_end]);
                let wanted = content_length(&head).unwrap_or(0);
                if headers_end + 4 + wanted > MAX_REQUEST_BYTES {
                    return Ok(ReadOutcome::TooLarge);
                }
                if buffer.len() >= headers_end + 4 + wanted {
                    break;
                }
            }
            if buffer.len() > MAX_REQUEST_BYTES {
                return Ok(ReadOutcome::TooLarge);
            }
        }
        Ok::<_, std::io::Error>(ReadOutcome::Complete)
    })
    .await;

    let response = match read_result {
        Ok(Ok(ReadOutcome::Complete)) if buffer.is_empty() => return Ok(()),
        Ok(Ok(ReadOutcome::Complete)) => {
            match std::str::from_utf8(&buffer).ok().and_then(parse_request) {
                Some(request) => route(&service, &request).await,
                None => HttpResponse::error(400, "Malformed HTTP request"),
            }
        }
        Ok(Ok(ReadOutcome::TooLarge)) => {
            warn!("Request exceeds {} bytes", MAX_REQUEST_BYTES);
            HttpResponse::error(
                413,
                format!("Request larger than {} bytes", MAX_REQUEST_BYTES),
            )
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            warn!("Request read timeout");
            HttpResponse::error(408, "Request timeout")
        }
    };

    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

fn find_headers_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}
