use async_trait::async_trait;
use cdp_assistant::api::{self, parse_request, route, HttpResponse};
use cdp_assistant::config::{AppConfig, ConfigOverrides};
use cdp_assistant::error::{AssistantError, Result};
use cdp_assistant::llm::{LlmBackend, LlmClient, LlmRequest};
use cdp_assistant::resolver::AnswerResolver;
use cdp_assistant::service::MessageService;
use cdp_assistant::storage::MemStorage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// LLM that can never be reached.
#[derive(Default)]
struct OfflineBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmBackend for OfflineBackend {
    async fn complete(&self, _request: &LlmRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AssistantError::Unreachable("connection refused".to_string()))
    }
}

/// LLM that answers with a body the resolver cannot parse.
struct BrokenBackend;

#[async_trait]
impl LlmBackend for BrokenBackend {
    async fn complete(&self, _request: &LlmRequest) -> Result<String> {
        Ok("<html>gateway error</html>".to_string())
    }
}

fn service_with(backend: Arc<dyn LlmBackend>) -> MessageService {
    MessageService::new(AnswerResolver::new(backend), Arc::new(MemStorage::new()))
}

fn post(question_json: &str) -> String {
    format!(
        "POST /api/messages HTTP/1.1\r\nHost: localhost\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        question_json.len(),
        question_json
    )
}

async fn send(service: &MessageService, raw: &str) -> (u16, serde_json::Value) {
    let request = parse_request(raw).expect("valid request");
    let HttpResponse { status, body } = route(service, &request).await;
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&body).expect("json body")
    };
    (status, json)
}

async fn message_count(service: &MessageService) -> usize {
    let (status, body) = send(service, "GET /api/messages HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 200);
    body.as_array().expect("array").len()
}

#[tokio::test]
async fn test_segment_source_question_without_llm() {
    let service = service_with(Arc::new(OfflineBackend::default()));

    let (status, message) = send(
        &service,
        &post(r#"{"question":"How do I set up a source in Segment?"}"#),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(message["id"], 1);
    assert_eq!(message["metadata"]["platform"], "segment");
    assert_eq!(message["metadata"]["category"], "how-to");
    assert_eq!(message["metadata"]["confidence"], 0.9);
    let answer = message["answer"].as_str().unwrap();
    assert!(answer.contains("To set up a new source in Segment"));
    assert!(answer.contains("https://segment.com/docs/connections/sources/"));
    assert!(message["createdAt"].is_string());
}

#[tokio::test]
async fn test_comparison_question_without_llm() {
    let service = service_with(Arc::new(OfflineBackend::default()));

    let (status, message) =
        send(&service, &post(r#"{"question":"compare audience segmentation"}"#)).await;

    assert_eq!(status, 200);
    assert_eq!(message["metadata"]["category"], "comparison");
    assert_eq!(message["metadata"]["confidence"], 0.85);
    assert_eq!(message["metadata"]["platform"], "multiple");
    let answer = message["answer"].as_str().unwrap();
    for heading in ["## Segment", "## mParticle", "## Lytics", "## Zeotap"] {
        assert_eq!(answer.lines().filter(|l| *l == heading).count(), 1, "{}", heading);
    }
    assert!(answer.contains("## Key Differences"));
}

#[tokio::test]
async fn test_empty_question_is_rejected() {
    let backend = Arc::new(OfflineBackend::default());
    let service = service_with(backend.clone());
    send(&service, &post(r#"{"question":"How do I track events in Lytics?"}"#)).await;
    let before = message_count(&service).await;

    let (status, body) = send(&service, &post(r#"{"question":""}"#)).await;

    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("question"));
    assert_eq!(message_count(&service).await, before);
    // Only the first, valid question reached the resolver.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_string_and_invalid_bodies_are_rejected() {
    let service = service_with(Arc::new(OfflineBackend::default()));

    let (status, _) = send(&service, &post(r#"{"question":7}"#)).await;
    assert_eq!(status, 400);

    let (status, body) = send(&service, &post("not json")).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));

    assert_eq!(message_count(&service).await, 0);
}

#[tokio::test]
async fn test_terminal_llm_failure_creates_no_message() {
    let service = service_with(Arc::new(BrokenBackend));

    let (status, body) = send(
        &service,
        &post(r#"{"question":"How do I set up a source in Segment?"}"#),
    )
    .await;

    assert_eq!(status, 400);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("configuration or connectivity"), "{}", error);
    assert!(!error.contains("Malformed"), "{}", error);
    assert_eq!(body["metadata"]["category"], "error");
    assert_eq!(body["metadata"]["confidence"], 0.1);
    assert_eq!(message_count(&service).await, 0);
}

#[test]
fn test_missing_credential_refuses_startup() {
    let err = AppConfig::resolve(ConfigOverrides::default(), |_| None).unwrap_err();
    assert!(matches!(err, AssistantError::MissingCredential(_)));

    let err = AppConfig::resolve(ConfigOverrides::default(), |key| {
        (key == "OPENAI_API_KEY").then(|| "default-key".to_string())
    })
    .unwrap_err();
    assert!(matches!(err, AssistantError::MissingCredential(_)));
}

#[tokio::test]
async fn test_platform_filter() {
    let service = service_with(Arc::new(OfflineBackend::default()));
    send(&service, &post(r#"{"question":"How do I set up a source in Segment?"}"#)).await;
    send(&service, &post(r#"{"question":"How do I create an audience in Lytics?"}"#)).await;
    send(&service, &post(r#"{"question":"Segment vs Lytics for tracking"}"#)).await;

    let (status, body) = send(&service, "GET /api/messages?platform=lytics HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 200);
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], 2);

    let (status, body) =
        send(&service, "GET /api/messages?platform=multiple HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) =
        send(&service, "GET /api/messages?platform=%6Cytics HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&service, "GET /api/messages?platform=tealium HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_dropped_llm_connection_falls_back() {
    // Reads the completion request, then hangs up without answering.
    let llm_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let llm_addr = llm_listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = llm_listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
    });

    let client = LlmClient::new(
        "sk-test".to_string(),
        "gpt-4o".to_string(),
        format!("http://{}", llm_addr),
    )
    .unwrap();
    let service = service_with(Arc::new(client));

    let (status, message) = send(
        &service,
        &post(r#"{"question":"How do I set up a source in Segment?"}"#),
    )
    .await;

    assert_eq!(status, 200, "{}", message);
    assert_eq!(message["metadata"]["platform"], "segment");
    assert_eq!(message["metadata"]["category"], "how-to");
    assert_eq!(message["metadata"]["confidence"], 0.9);
    assert!(message["answer"]
        .as_str()
        .unwrap()
        .contains("To set up a new source in Segment"));
}

#[tokio::test]
async fn test_unknown_route() {
    let service = service_with(Arc::new(OfflineBackend::default()));
    let (status, body) = send(&service, "DELETE /api/messages HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("DELETE"));

    let (status, body) = send(&service, "GET /api/health HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_http_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = Arc::new(service_with(Arc::new(OfflineBackend::default())));
    tokio::spawn(api::serve(listener, service));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(post(r#"{"question":"How does Zeotap handle user profiles?"}"#).as_bytes())
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    let body = response.split("\r\n\r\n").nth(1).unwrap();
    let message: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(message["metadata"]["platform"], "zeotap");
    assert_eq!(message["metadata"]["confidence"], 0.85);
}

#[tokio::test]
async fn test_oversized_request_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = Arc::new(service_with(Arc::new(OfflineBackend::default())));
    tokio::spawn(api::serve(listener, service.clone()));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"POST /api/messages HTTP/1.1\r\nHost: localhost\r\n\
              Content-Type: application/json\r\nContent-Length: 2000000\r\n\r\n",
        )
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"), "{}", response);
    assert!(!response.contains("Invalid JSON body"));
    assert_eq!(message_count(&service).await, 0);
}
