use std::time::{Duration, Instant};

use persona_chat::config::SamplingConfig;
use persona_chat::error::{ERROR_REPLY_PREFIX, FALLBACK_REPLY};
use persona_chat::{ApiKey, CompletionClient, CompletionError, ConversationLog, Role, display_reply};
use tokio::net::TcpListener;

mod common;
use common::{one_shot_server, read_request};

fn client(endpoint: &str, timeout: Duration) -> CompletionClient {
    CompletionClient::new(
        endpoint,
        "meta/llama-4-maverick-17b-128e-instruct",
        SamplingConfig::default(),
        timeout,
        ApiKey::new("nvapi-test"),
    )
    .unwrap()
}

fn log_with_user(text: &str) -> ConversationLog {
    let mut log = ConversationLog::initialize("你是Cica的AI分身");
    log.append(Role::User, text);
    log
}

#[tokio::test]
async fn returns_first_choice_verbatim_and_sends_expected_request() {
    let (endpoint, server) = one_shot_server(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"嗯"}},{"message":{"content":"ignored"}}]}"#,
    )
    .await;

    let log = log_with_user("你好");
    let reply = client(&endpoint, Duration::from_secs(30))
        .complete(log.messages())
        .await
        .unwrap();
    assert_eq!(reply, "嗯");

    let request = server.await.unwrap();
    let (head, body) = request.split_once("\r\n\r\n").unwrap();
    let head = head.to_lowercase();
    assert!(head.starts_with("post /v1/chat/completions "));
    assert!(head.contains("authorization: bearer nvapi-test"));
    assert!(head.contains("accept: application/json"));

    let body: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(body["model"], "meta/llama-4-maverick-17b-128e-instruct");
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["top_p"], 1.0);
    assert_eq!(body["stream"], false);
    assert!((body["temperature"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    assert_eq!(
        body["messages"],
        serde_json::json!([
            {"role": "system", "content": "你是Cica的AI分身"},
            {"role": "user", "content": "你好"},
        ])
    );
}

#[tokio::test]
async fn reply_whitespace_is_not_trimmed() {
    let (endpoint, _server) =
        one_shot_server("200 OK", r#"{"choices":[{"message":{"content":"  哈哈哈\n"}}]}"#).await;

    let reply = client(&endpoint, Duration::from_secs(30))
        .complete(log_with_user("x").messages())
        .await
        .unwrap();
    assert_eq!(reply, "  哈哈哈\n");
}

#[tokio::test]
async fn empty_choices_flatten_to_fallback() {
    let (endpoint, _server) = one_shot_server("200 OK", r#"{"choices":[]}"#).await;

    let result = client(&endpoint, Duration::from_secs(30))
        .complete(log_with_user("在吗").messages())
        .await;
    assert!(matches!(result, Err(CompletionError::EmptyChoice)));
    assert_eq!(display_reply(&result), FALLBACK_REPLY);
}

#[tokio::test]
async fn non_success_status_is_an_http_error() {
    let (endpoint, _server) =
        one_shot_server("401 Unauthorized", r#"{"error":"invalid api key"}"#).await;

    let result = client(&endpoint, Duration::from_secs(30))
        .complete(log_with_user("hi").messages())
        .await;
    match &result {
        Err(CompletionError::Http { status, body }) => {
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("invalid api key"));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
    let shown = display_reply(&result);
    assert!(shown.starts_with(ERROR_REPLY_PREFIX));
    assert!(shown.contains("401"));
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let (endpoint, _server) = one_shot_server("200 OK", "<html>gateway</html>").await;

    let result = client(&endpoint, Duration::from_secs(30))
        .complete(log_with_user("hi").messages())
        .await;
    assert!(matches!(result, Err(CompletionError::Parse(_))));
    assert!(display_reply(&result).starts_with(ERROR_REPLY_PREFIX));
}

#[tokio::test]
async fn choice_without_message_is_a_parse_error() {
    let (endpoint, _server) = one_shot_server("200 OK", r#"{"choices":[{"text":"x"}]}"#).await;

    let result = client(&endpoint, Duration::from_secs(30))
        .complete(log_with_user("hi").messages())
        .await;
    assert!(matches!(result, Err(CompletionError::Parse(_))));
}

#[tokio::test]
async fn slow_server_times_out_within_the_configured_bound() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let timeout = Duration::from_millis(300);
    let endpoint = format!("http://{addr}/v1/chat/completions");
    let started = Instant::now();
    let result = client(&endpoint, timeout)
        .complete(log_with_user("hi").messages())
        .await;
    let elapsed = started.elapsed();

    let err = result.as_ref().unwrap_err();
    assert!(err.is_network());
    assert!(err.is_timeout());
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    assert!(display_reply(&result).starts_with(ERROR_REPLY_PREFIX));
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    // bind then drop to get a port nobody listens on
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();

    let endpoint = format!("http://{addr}/v1/chat/completions");
    let result = client(&endpoint, Duration::from_secs(5))
        .complete(log_with_user("hi").messages())
        .await;
    assert!(matches!(result, Err(CompletionError::Network(_))));
}
