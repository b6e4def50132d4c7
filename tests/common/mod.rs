#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::UnboundedReceiver,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub const CHALLENGE: &str = "mock-challenge";

/// a tiny relay on localhost: accepts every EVENT and AUTH, ends every REQ right away,
/// counts 3 for any COUNT and hangs up when it receives the text `close-me`
pub struct MockRelay {
    pub url: String,
}

impl MockRelay {
    pub async fn start() -> MockRelay {
        MockRelay::start_with(Vec::new()).await
    }

    /// also pushes `frames` verbatim to every client right after the greeting
    pub async fn start_with(frames: Vec<String>) -> MockRelay {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let frames = Arc::new(frames);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, frames.clone()));
            }
        });
        MockRelay {
            url: format!("ws://{}", addr),
        }
    }
}

async fn serve(stream: TcpStream, frames: Arc<Vec<String>>) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    let greeting = json!(["AUTH", CHALLENGE]).to_string();
    if ws.send(Message::text(greeting)).await.is_err() {
        return;
    }
    for frame in frames.iter() {
        if ws.send(Message::text(frame.clone())).await.is_err() {
            return;
        }
    }

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        if text.as_str() == "close-me" {
            let _ = ws.close(None).await;
            return;
        }

        let Ok(frame) = serde_json::from_str::<Vec<Value>>(text.as_str()) else {
            continue;
        };
        let reply = match frame.first().and_then(Value::as_str) {
            Some("EVENT") | Some("AUTH") => json!(["OK", frame[1]["id"], true, ""]),
            Some("REQ") => json!(["EOSE", frame[1]]),
            Some("COUNT") => json!(["COUNT", frame[1], {"count": 3, "approximate": false}]),
            _ => continue,
        };
        if ws.send(Message::text(reply.to_string())).await.is_err() {
            return;
        }
    }
}

/// an address where nobody is listening
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// wait for the next item that satisfies `predicate`, skipping the rest
pub async fn next_matching<T>(
    receiver: &mut UnboundedReceiver<T>,
    predicate: impl Fn(&T) -> bool,
) -> T {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let item = receiver.recv().await.expect("channel closed");
            if predicate(&item) {
                return item;
            }
        }
    })
    .await
    .expect("timed out waiting for a notification")
}
