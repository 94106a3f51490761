//! Loopback responder shared by the HTTP tests.
//!
//! Answers by path prefix: `/fail` with 500, `/missing` with 404, `/hang`
//! never answers, anything else with 200 and the request path as the body.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn respond(mut socket: TcpStream) {
    let mut buf = vec![0u8; 4096];
    let mut read = 0;
    while read < buf.len() {
        match socket.read(&mut buf[read..]).await {
            Ok(0) | Err(_) => break,
            Ok(n) => read += n,
        }
        if buf[..read].windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }

    let request = String::from_utf8_lossy(&buf[..read]).to_string();
    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
    let status = if path.starts_with("/fail") {
        "500 Internal Server Error"
    } else if path.starts_with("/missing") {
        "404 Not Found"
    } else if path.starts_with("/hang") {
        tokio::time::sleep(Duration::from_secs(60)).await;
        return;
    } else {
        "200 OK"
    };

    let body = if status == "200 OK" { path.as_str() } else { "" };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Starts the responder and returns its base URL.
pub async fn start_responder() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(respond(socket));
        }
    });
    format!("http://{}", addr)
}
