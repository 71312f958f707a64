//! Shared utilities for integration tests: a programmable HTTP node.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ipc_client::config::{FaucetMethod, NetworkEndpoint};

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl MockRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

type Handler = dyn Fn(&MockRequest) -> (u16, String) + Send + Sync;

/// Handle to a running mock server.
pub struct MockServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl MockServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start an HTTP server on an ephemeral port answering through `handler`.
pub async fn start_programmable_backend<F>(handler: F) -> MockServer
where
    F: Fn(&MockRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler: Arc<Handler> = Arc::new(handler);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = handler.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let _ = serve_one(socket, handler, seen).await;
            });
        }
    });

    MockServer { addr, requests }
}

async fn serve_one(
    mut socket: TcpStream,
    handler: Arc<Handler>,
    seen: Arc<Mutex<Vec<MockRequest>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request = MockRequest {
        method,
        path,
        body: buf[header_end..].to_vec(),
    };
    seen.lock().unwrap().push(request.clone());

    let (status, body) = handler(&request);
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// Start a JSON-RPC node whose results come from `results(method, params)`.
///
/// `Err((code, message))` is sent back as a JSON-RPC error object.
pub async fn start_rpc_node<F>(results: F) -> MockServer
where
    F: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
{
    start_programmable_backend(move |request| {
        let call = request.json();
        let method = call["method"].as_str().unwrap_or_default().to_string();
        let body = match results(&method, &call["params"]) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": call["id"], "result": result }),
            Err((code, message)) => json!({
                "jsonrpc": "2.0",
                "id": call["id"],
                "error": { "code": code, "message": message }
            }),
        };
        (200, body.to_string())
    })
    .await
}

/// JSON-RPC method names received by a node, in order.
pub fn rpc_methods(server: &MockServer) -> Vec<String> {
    server
        .requests()
        .iter()
        .map(|r| r.json()["method"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Endpoint for a local test network served by `rpc_url`.
pub fn local_endpoint(rpc_url: String) -> NetworkEndpoint {
    NetworkEndpoint {
        network_id: 0xff,
        name: "local".to_string(),
        rpc_url,
        identity_manager_address: Some("0x7c338672f483795eca47106dc395660d95041dbe".parse().unwrap()),
        registry_address: Some("0x2cc31912b2b0f3075a87b3640923d45a26cef3ee".parse().unwrap()),
        faucet_url_template: String::new(),
        faucet_method: FaucetMethod::Post,
        chain_id: Some(0xff),
    }
}
