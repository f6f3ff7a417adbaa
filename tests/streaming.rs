use perf_chat::api::{ HttpApi, PerfApi };
use perf_chat::error::{ ApiError, ChatError };
use perf_chat::models::chat::Role;
use perf_chat::session::{ SessionConfig, StreamOutcome, StreamingChatSession };
use perf_chat::store::{ FileThreadStore, MemoryThreadStore, ThreadStore };
use perf_chat::threads::ThreadDirectory;
use serde_json::json;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::net::TcpListener;
use wiremock::matchers::{ method, path };
use wiremock::{ Mock, MockServer, ResponseTemplate };

/// Serves one SSE response, writing each chunk separately with a pause
/// between them. Returns `None` where local listeners are not permitted.
async fn start_sse_server(
    chunks: Vec<&'static [u8]>,
    hold_open: Duration
) -> Option<(String, tokio::task::JoinHandle<()>)> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            return None;
        }
        Err(err) => panic!("failed to bind local test listener: {err}"),
    };
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 8192];
        let _ = socket.read(&mut buf).await;

        let headers =
            b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n";
        let _ = socket.write_all(headers).await;

        for chunk in chunks {
            let _ = socket.write_all(chunk).await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(hold_open).await;
        let _ = socket.shutdown().await;
    });

    Some((format!("http://{addr}"), handle))
}

fn config() -> SessionConfig {
    SessionConfig {
        model: "gpt-4o".into(),
        user_id: "user-123".into(),
    }
}

#[tokio::test]
async fn tokens_split_across_packets_are_reassembled() {
    let Some((base_url, _server)) = start_sse_server(
        vec![
            &b"data: {\"type\":\"token\",\"content\":\"Ber"[..],
            &b"gamot\"}\n\ndata: {\"type\":\"token\",\"content\":\" caf\xC3"[..],
            &b"\xA9\"}\n\ndata: {\"type\":\"message\",\"content\":{\"type\":\"ai\"}}\n"[..],
            &b"\ndata: [DONE]\n\n"[..]
        ],
        Duration::ZERO
    ).await else {
        eprintln!("skipping test: sandbox does not permit local TCP listeners");
        return;
    };

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileThreadStore::new(dir.path().join("state/thread.json")));
    let api: Arc<dyn PerfApi> = Arc::new(HttpApi::new(&base_url).unwrap());
    let session = StreamingChatSession::new(api, store.clone(), config());

    let outcome = session.submit("something citrus").await.unwrap();
    assert!(matches!(outcome, StreamOutcome::Completed));

    let snapshot = session.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[0].role, Role::Human);
    assert_eq!(snapshot.messages[1].role, Role::Assistant);
    assert_eq!(snapshot.messages[1].content, "Bergamot café");

    let stored = store.current().unwrap();
    assert!(stored.is_some());
    assert_eq!(stored, snapshot.thread_id);
}

#[tokio::test]
async fn cancel_stops_a_live_stream() {
    let Some((base_url, _server)) = start_sse_server(
        vec![&b"data: {\"type\":\"token\",\"content\":\"Oud\"}\n\n"[..]],
        Duration::from_secs(5)
    ).await else {
        eprintln!("skipping test: sandbox does not permit local TCP listeners");
        return;
    };

    let api: Arc<dyn PerfApi> = Arc::new(HttpApi::new(&base_url).unwrap());
    let store = Arc::new(MemoryThreadStore::with_thread("t-1"));
    let session = StreamingChatSession::new(api, store, config());
    let mut updates = session.subscribe();

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.submit("something smoky").await })
    };

    tokio::time
        ::timeout(
            Duration::from_secs(2),
            updates.wait_for(|s| s.messages.last().map(|m| m.content.as_str()) == Some("Oud"))
        ).await
        .expect("first token never arrived")
        .unwrap();

    session.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(2), running).await.unwrap().unwrap().unwrap();
    assert!(matches!(outcome, StreamOutcome::Cancelled));

    let snapshot = session.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.messages[1].content, "Oud");
}

#[tokio::test]
async fn rejected_stream_leaves_empty_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agentic-rag-alfa/stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server).await;

    let api: Arc<dyn PerfApi> = Arc::new(HttpApi::new(&server.uri()).unwrap());
    let session = StreamingChatSession::new(api, Arc::new(MemoryThreadStore::with_thread("t-1")), config());

    match session.submit("hello").await.unwrap() {
        StreamOutcome::Failed(ChatError::Connection(ApiError::Status { status, .. })) => {
            assert_eq!(status.as_u16(), 503);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    let snapshot = session.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[1].content, "");
}

#[tokio::test]
async fn first_message_of_a_new_thread_registers_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agentic-rag-alfa/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: {\"type\":\"token\",\"content\":\"Hi\"}\n\ndata: [DONE]\n\n")
        )
        .mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                json!({ "thread_id": "ignored", "user_id": "user-123", "summary": "Date night" })
            )
        )
        .mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "threads": [], "hasMore": false })))
        .mount(&server).await;

    let api: Arc<dyn PerfApi> = Arc::new(HttpApi::new(&server.uri()).unwrap());
    let directory = Arc::new(ThreadDirectory::new(api.clone(), "user-123", 20));
    let session = StreamingChatSession::with_observer(
        api,
        Arc::new(MemoryThreadStore::new()),
        directory,
        config()
    );

    let outcome = session.submit("Date night").await.unwrap();
    assert!(matches!(outcome, StreamOutcome::Completed));
    let thread_id = session.snapshot().thread_id.unwrap();

    let mut registered = None;
    for _ in 0..50 {
        let requests = server.received_requests().await.unwrap_or_default();
        registered = requests
            .into_iter()
            .find(|r| r.method.as_str() == "POST" && r.url.path() == "/threads");
        if registered.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let body: serde_json::Value = registered.expect("thread was never registered").body_json().unwrap();
    assert_eq!(body, json!({ "thread_id": thread_id, "user_id": "user-123", "summary": "Date night" }));
}
