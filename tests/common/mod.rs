//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use granblue_proxy::config::ControllerConfig;
use granblue_proxy::http::{CacheTransport, ControllerServer, Transports};
use granblue_proxy::lifecycle::Shutdown;

/// Read a request head (up to and including the blank line) off `socket`,
/// then drain a `Content-Length` body if one was announced.
pub async fn read_head(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&data).into_owned(),
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    };

    let head = String::from_utf8_lossy(&data[..end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut remaining = content_length.saturating_sub(data.len() - end);
    while remaining > 0 {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => remaining = remaining.saturating_sub(n),
        }
    }

    head
}

/// Start a programmable HTTP backend on a free port.
///
/// `f` receives each request head and returns status line, extra headers and body.
/// Every request head seen is recorded in the returned log.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<Mutex<Vec<String>>>)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (&'static str, Vec<(&'static str, String)>, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_task = seen.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let seen = seen_task.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                seen.lock().unwrap().push(head.clone());
                let (status, headers, body) = f(head).await;

                let mut response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                    status,
                    body.len()
                );
                for (name, value) in headers {
                    response.push_str(&format!("{}: {}\r\n", name, value));
                }
                response.push_str("\r\n");
                response.push_str(&body);

                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    (addr, seen)
}

/// Start a backend that always returns `200 OK` with a fixed body.
pub async fn start_mock_backend(
    response: &'static str,
) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    start_programmable_backend(move |_| async move {
        ("200 OK", Vec::new(), response.to_string())
    })
    .await
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Client sending every request through `proxy` as a forward proxy.
pub fn client_via(proxy: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .proxy(reqwest::Proxy::http(format!("http://{}", proxy)).unwrap())
        .build()
        .unwrap()
}

/// Client talking to hosts directly, ignoring environment proxies.
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Direct transport whose "origin" is the given address.
pub fn origin_client(origin: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .proxy(reqwest::Proxy::http(format!("http://{}", origin)).unwrap())
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Transports for a controller under test.
pub fn transports(direct: reqwest::Client, cache: Option<SocketAddr>) -> Transports {
    Transports {
        direct,
        cache: cache.map(|addr| CacheTransport::new(addr.to_string()).unwrap()),
    }
}

/// A running service; stopped on drop.
pub struct Running {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub stopped: JoinHandle<()>,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a controller on a free port.
pub async fn start_controller(config: ControllerConfig, transports: Transports) -> Running {
    start_server(ControllerServer::new(&config, transports)).await
}

/// Run an already configured controller on a free port.
pub async fn start_server(server: ControllerServer) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();

    let stopped = tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    Running {
        addr,
        shutdown,
        stopped,
    }
}
