//! Throwaway REST server for driving agencyd end to end.

#![allow(dead_code)]

use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }

    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone)]
struct Route {
    method: String,
    path: String,
    status: u16,
    body: Option<Value>,
}

#[derive(Clone)]
pub struct FakeApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    routes: Arc<Mutex<Vec<Route>>>,
}

impl FakeApi {
    pub fn start() -> FakeApi {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake api");
        let addr = listener.local_addr().expect("local addr");
        let api = FakeApi {
            base_url: format!("http://{}/api", addr),
            requests: Arc::new(Mutex::new(Vec::new())),
            routes: Arc::new(Mutex::new(Vec::new())),
        };
        let server = api.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(s) => server.serve(s),
                    Err(_) => break,
                }
            }
        });
        api
    }

    /// Later routes for the same method and path win.
    pub fn route(&self, method: &str, path: &str, status: u16, body: Option<Value>) {
        self.routes.lock().expect("routes").push(Route {
            method: method.to_string(),
            path: path.to_string(),
            status,
            body,
        });
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests").clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().last().cloned().expect("at least one request")
    }

    fn serve(&self, stream: TcpStream) {
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).is_err() {
            return;
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or("").to_string();
        let target = parts.next().unwrap_or("").to_string();
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (target.clone(), String::new()),
        };

        let mut content_length = 0usize;
        let mut authorization = None;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).is_err() {
                return;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim().to_ascii_lowercase();
                if name == "content-length" {
                    content_length = value.trim().parse().unwrap_or(0);
                } else if name == "authorization" {
                    authorization = Some(value.trim().to_string());
                }
            }
        }
        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).is_err() {
            return;
        }

        self.requests.lock().expect("requests").push(Recorded {
            method: method.clone(),
            path: path.clone(),
            query,
            authorization,
            body: String::from_utf8_lossy(&body).to_string(),
        });

        let route = self
            .routes
            .lock()
            .expect("routes")
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .cloned();
        let (status, payload) = match route {
            Some(r) => (r.status, r.body.map(|b| b.to_string()).unwrap_or_default()),
            None => (404, r#"{"message":"no route"}"#.to_string()),
        };

        let mut out = stream;
        let _ = write!(
            out,
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            payload.len(),
            payload
        );
        let _ = out.flush();
    }
}
