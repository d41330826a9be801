//! End-to-end calls against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, points a `Client` at it with
//! the endpoint override, and drives every surface through the real `ureq`
//! transport: standard calls, export in both line formats, service-declared
//! errors, the timeout path, and bulk bodies beyond ureq's default cap.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chimp_core::{ApiMode, ChimpError, Client, ClientConfig, Dispatched, UreqTransport};
use serde_json::json;

const SECRET: &str = "0123456789abcdef";
const API_KEY: &str = "0123456789abcdef-us6";

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, SECRET).await
        })
        .unwrap();
    });

    addr
}

/// Plain TCP server answering every POST with `body`, for payloads the
/// mock server cannot produce cheaply.
fn serve_body(body: String) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            // The client may hang up early once it hits its body limit.
            let _ = stream
                .write_all(head.as_bytes())
                .and_then(|()| stream.write_all(body.as_bytes()));
        }
    });

    addr
}

/// Header-row export body of at least `min_bytes`; returns it with its
/// record count.
fn large_export_body(min_bytes: usize) -> (String, usize) {
    let name = "x".repeat(100);
    let mut body = String::from("[\"id\",\"name\"]\n");
    let mut rows = 0;
    while body.len() < min_bytes {
        body.push_str(&format!("[{rows},\"{name}\"]\n"));
        rows += 1;
    }
    (body, rows)
}

fn client(addr: SocketAddr) -> Client {
    Client::new(ClientConfig::new().api_key(API_KEY).endpoint(format!("http://{addr}"))).unwrap()
}

#[test]
fn standard_and_export_lifecycle() {
    let client = client(start_server());

    // Step 1: ping.
    let pong = client.invoke("helper_ping", None).unwrap();
    assert_eq!(pong["msg"], "Everything's Chimpy!");

    // Step 2: subscribe a new member.
    let sub = client
        .invoke(
            "lists_subscribe",
            Some(json!({
                "id": mock_server::SEED_LIST_ID,
                "email": {"email": "ada@example.com"},
                "merge_vars": {"FNAME": "Ada", "LNAME": "Lovelace"}
            })),
        )
        .unwrap();
    assert_eq!(sub["email"], "ada@example.com");

    // Step 3: subscribing again is a service-declared error.
    let err = client
        .invoke(
            "lists_subscribe",
            Some(json!({"id": mock_server::SEED_LIST_ID, "email": {"email": "ada@example.com"}})),
        )
        .unwrap_err();
    match err {
        ChimpError::RemoteService { code, name, .. } => {
            assert_eq!(code, Some(214));
            assert_eq!(name.as_deref(), Some("List_AlreadySubscribed"));
        }
        other => panic!("unexpected {other:?}"),
    }

    // Step 4: export the list; header row is zipped into records.
    let records = client
        .export()
        .invoke("list", Some(json!({"id": mock_server::SEED_LIST_ID})))
        .unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Email Address"], mock_server::SEED_EMAIL);
    assert_eq!(records[1]["Email Address"], "ada@example.com");
    assert_eq!(records[1]["First Name"], "Ada");
    assert_eq!(records[1]["EUID"], sub["euid"]);

    // Step 5: export mode was consumed; the next call is standard again.
    let members = client
        .invoke("lists_members", Some(json!({"id": mock_server::SEED_LIST_ID})))
        .unwrap();
    assert_eq!(members["total"], 2);

    // Step 6: object-per-line export.
    let activity = client
        .invoke_with(
            "campaignSubscriberActivity",
            Some(json!({"id": mock_server::SEED_CAMPAIGN_ID})),
            ApiMode::Export,
        )
        .unwrap();
    assert_eq!(activity[0][mock_server::SEED_EMAIL][1]["action"], "click");

    // Step 7: unsubscribe and confirm.
    let done = client
        .invoke(
            "lists_unsubscribe",
            Some(json!({"id": mock_server::SEED_LIST_ID, "email": {"email": "ada@example.com"}})),
        )
        .unwrap();
    assert_eq!(done["complete"], true);
    let lists = client.invoke("lists_list", None).unwrap();
    assert_eq!(lists["data"][0]["stats"]["member_count"], 1);
}

#[test]
fn dispatch_through_positional_arguments() {
    let client = client(start_server());

    let err = client.dispatch("export", vec![json!({})]).unwrap_err();
    assert!(matches!(err, ChimpError::ArgumentCount { given: 1, expected: 0 }));

    let pending = match client.dispatch("export", Vec::new()).unwrap() {
        Dispatched::Pending(call) => call,
        Dispatched::Complete(value) => panic!("export returned a value: {value}"),
    };
    let records = pending
        .dispatch("list", vec![json!({"id": mock_server::SEED_LIST_ID})])
        .unwrap()
        .into_value()
        .unwrap();
    assert_eq!(records[0]["Email Address"], mock_server::SEED_EMAIL);

    let pong = client
        .dispatch("helper_ping", Vec::new())
        .unwrap()
        .into_value()
        .unwrap();
    assert_eq!(pong["msg"], "Everything's Chimpy!");
}

#[test]
fn wrong_secret_is_remote_error() {
    let addr = start_server();
    let client =
        Client::new(ClientConfig::new().api_key("ffffffff-us6").endpoint(format!("http://{addr}"))).unwrap();

    let err = client.invoke("helper_ping", None).unwrap_err();
    assert!(matches!(err, ChimpError::RemoteService { code: Some(104), .. }));

    // The export surface reports the same failure as its only record.
    let err = client.export().invoke("list", Some(json!({"id": "l1"}))).unwrap_err();
    assert!(matches!(err, ChimpError::RemoteService { code: Some(104), .. }));
}

#[test]
fn unknown_method_is_remote_error() {
    let client = client(start_server());
    let err = client.invoke("lists_frobnicate", None).unwrap_err();
    assert!(matches!(err, ChimpError::RemoteService { code: Some(-32601), .. }));
}

#[test]
fn slow_response_times_out() {
    let addr = start_server();
    let client = Client::new(
        ClientConfig::new()
            .api_key(API_KEY)
            .timeout_seconds(1.0)
            .endpoint(format!("http://{addr}")),
    )
    .unwrap();

    let err = client
        .invoke("helper_ping", Some(json!({"delay_ms": 3000})))
        .unwrap_err();
    assert!(matches!(err, ChimpError::TransportTimeout { .. }), "got {err:?}");
}

#[test]
fn connection_refused_is_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = client(addr).invoke("helper_ping", None).unwrap_err();
    assert!(matches!(err, ChimpError::Transport(_)), "got {err:?}");
}

#[test]
fn export_body_over_ten_mebibytes_is_decoded() {
    let (body, rows) = large_export_body(11 * 1024 * 1024);
    let addr = serve_body(body);
    let client = Client::new(
        ClientConfig::new()
            .api_key(API_KEY)
            .timeout_seconds(30.0)
            .endpoint(format!("http://{addr}")),
    )
    .unwrap();

    let records = client.export().invoke("list", None).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), rows);
    assert_eq!(records[0]["id"], 0);
    assert_eq!(records[rows - 1]["id"], rows - 1);
    assert_eq!(records[rows - 1]["name"].as_str().unwrap().len(), 100);
}

#[test]
fn explicit_body_limit_is_enforced() {
    let (body, _) = large_export_body(64 * 1024);
    let addr = serve_body(body);
    let transport = UreqTransport::new(Duration::from_secs(5)).with_body_limit(1024);
    let client = Client::with_transport(
        ClientConfig::new().api_key(API_KEY).endpoint(format!("http://{addr}")),
        Arc::new(transport),
    )
    .unwrap();

    let err = client.export().invoke("list", None).unwrap_err();
    assert!(matches!(err, ChimpError::Transport(_)), "got {err:?}");
}
