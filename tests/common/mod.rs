#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// `admin:district`, base64.
pub const BASIC_AUTH: &str = "Basic YWRtaW46ZGlzdHJpY3Q=";

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct Route {
    method: &'static str,
    prefix: String,
    status: u16,
    body: String,
}

/// Canned-response HTTP server on a loopback port; one request per connection.
pub struct StubServer {
    pub url: String,
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let url = format!("http://{}", listener.local_addr().expect("stub addr"));
        let routes: Arc<Mutex<Vec<Route>>> = Arc::new(Mutex::new(Vec::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (r, q) = (Arc::clone(&routes), Arc::clone(&requests));
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(s) => serve(s, &r, &q),
                    Err(_) => break,
                }
            }
        });

        Self {
            url,
            routes,
            requests,
        }
    }

    /// Answers requests whose target starts with `prefix` (below `/api/`).
    /// Later routes take precedence.
    pub fn route(&self, method: &'static str, prefix: &str, status: u16, body: Value) -> &Self {
        self.routes.lock().expect("routes lock").push(Route {
            method,
            prefix: format!("/api/{}", prefix),
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn get(&self, prefix: &str, body: Value) -> &Self {
        self.route("GET", prefix, 200, body)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = bare_cmd();
        cmd.args([
            "--server_url",
            self.url.as_str(),
            "--username",
            "admin",
            "--password",
            "district",
        ]);
        cmd
    }
}

/// The binary with logging and proxy settings of the caller stripped.
pub fn bare_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("metahealth");
    for var in [
        "RUST_LOG",
        "HTTP_PROXY",
        "http_proxy",
        "HTTPS_PROXY",
        "https_proxy",
        "ALL_PROXY",
        "all_proxy",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn serve(stream: TcpStream, routes: &Mutex<Vec<Route>>, requests: &Mutex<Vec<Recorded>>) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    });
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).is_err() || line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.trim_end().split_once(':') {
            let value = value.trim().to_string();
            match name.to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().unwrap_or(0),
                "authorization" => authorization = Some(value),
                _ => {}
            }
        }
    }
    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let route = routes
        .lock()
        .expect("routes lock")
        .iter()
        .rev()
        .find(|r| r.method == method && target.starts_with(&r.prefix))
        .cloned();
    requests.lock().expect("requests lock").push(Recorded {
        method,
        target,
        authorization,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let (status, body) = match route {
        Some(r) => (r.status, r.body),
        None => (404, "{}".to_string()),
    };
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let mut stream = stream;
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// A loopback address nothing listens on.
pub fn closed_server_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{}", addr)
}

/// Server whose metadata is clean and whose only program rule is valid.
pub fn healthy_server(version: &str) -> StubServer {
    let server = StubServer::start();
    server
        .get(
            "metadata.json",
            serde_json::json!({
                "system": {"id": "sys", "version": version},
                "dataElements": [{"id": "de1"}, {"id": "de2"}],
                "programs": [{"id": "P1"}]
            }),
        )
        .get(
            "sections.json",
            serde_json::json!({"sections": [{"id": "S1", "dataElements": [{"id": "de1"}]}]}),
        )
        .get(
            "dataSets.json",
            serde_json::json!({"dataSets": [{"id": "DS1", "dataSetElements": [{"dataElement": {"id": "de1"}}]}]}),
        )
        .get(
            "categories.json",
            serde_json::json!({"categories": [{"id": "C1", "categoryOptions": [{"id": "o1"}]}]}),
        )
        .get("system/info", serde_json::json!({"version": version}))
        .get("programs.json", serde_json::json!({"programs": [{"id": "P1"}]}))
        .get(
            "programRules.json",
            serde_json::json!({"programRules": [{"id": "R1", "condition": "true"}]}),
        )
        .get(
            "programRuleActions.json",
            serde_json::json!({"programRuleActions": []}),
        )
        .route(
            "POST",
            "programRules/condition/description",
            200,
            serde_json::json!({"status": "OK", "description": "Valid"}),
        );
    server
}
