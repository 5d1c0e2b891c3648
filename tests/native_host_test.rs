//! Native messaging host tests over in-memory pipes.
//!
//! Run with: cargo test --test native_host_test

use pagesmith::config::Config;
use pagesmith::host;
use pagesmith::protocol::native::{read_message, write_message};
use serde_json::{json, Value};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

const MAX: usize = 1024 * 1024;

struct Client {
    to_host: DuplexStream,
    from_host: DuplexStream,
    host: JoinHandle<pagesmith::Result<()>>,
}

impl Client {
    fn start(config: Config) -> Self {
        let (to_host, host_in) = tokio::io::duplex(64 * 1024);
        let (host_out, from_host) = tokio::io::duplex(64 * 1024);
        let host = tokio::spawn(async move { host::serve(host_in, host_out, &config).await });
        Self {
            to_host,
            from_host,
            host,
        }
    }

    async fn send(&mut self, frame: Value) {
        write_message(&mut self.to_host, &frame).await.unwrap();
    }

    /// Send a frame whose payload is taken as-is.
    async fn send_raw(&mut self, payload: &[u8]) {
        let len = payload.len() as u32;
        self.to_host.write_all(&len.to_le_bytes()).await.unwrap();
        self.to_host.write_all(payload).await.unwrap();
    }

    async fn next(&mut self) -> Value {
        read_message(&mut self.from_host, MAX).await.unwrap().unwrap()
    }

    async fn close(self) {
        drop(self.to_host);
        self.host.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn replies_echo_request_id() {
    let mut client = Client::start(Config::default());

    client
        .send(json!({
            "requestId": 1,
            "action": "register-script",
            "id": "abc-1",
            "targetUrl": "https://www.foo.com/page",
            "code": "document.title='x'"
        }))
        .await;
    assert_eq!(
        client.next().await,
        json!({"requestId": 1, "response": {"success": true, "status": "registered"}})
    );

    client
        .send(json!({"requestId": "two", "action": "list-registered"}))
        .await;
    let frame = client.next().await;
    assert_eq!(frame["requestId"], "two");
    assert_eq!(frame["response"]["scripts"][0]["matchPattern"], "*://*.foo.com/*");

    client.close().await;
}

#[tokio::test]
async fn unknown_actions_get_no_frame() {
    let mut client = Client::start(Config::default());

    client.send(json!({"requestId": 1, "action": "not-mine"})).await;
    client.send(json!({"requestId": 2, "action": "check-capability"})).await;

    assert_eq!(
        client.next().await,
        json!({"requestId": 2, "response": {"available": true}})
    );

    client.close().await;
}

#[tokio::test]
async fn set_capability_toggles_runtime() {
    let mut config = Config::default();
    config.runtime.version = Some(137);
    let mut client = Client::start(config);

    client
        .send(json!({"requestId": 1, "action": "set-capability", "enabled": false}))
        .await;
    assert_eq!(
        client.next().await["response"],
        json!({"success": true, "status": "disabled"})
    );

    client.send(json!({"requestId": 2, "action": "check-capability"})).await;
    let frame = client.next().await;
    assert_eq!(frame["response"]["available"], false);
    assert!(frame["response"]["guidance"]
        .as_str()
        .unwrap()
        .contains("Developer Mode"));

    client
        .send(json!({"requestId": 3, "action": "set-capability"}))
        .await;
    assert_eq!(client.next().await["response"]["success"], false);

    client.close().await;
}

#[tokio::test]
async fn surface_events_are_forwarded() {
    let mut client = Client::start(Config::default());

    client
        .send(json!({
            "requestId": 9,
            "action": "open-side-surface",
            "sender": {"tabId": 3, "windowId": 1}
        }))
        .await;

    let frames = [client.next().await, client.next().await];
    assert!(frames
        .iter()
        .any(|f| f == &json!({"requestId": 9, "response": {"status": "opened"}})));
    assert!(frames
        .iter()
        .any(|f| f == &json!({"event": "open-side-surface", "tabId": 3, "windowId": 1})));

    client.close().await;
}

#[tokio::test]
async fn malformed_frame_does_not_stop_the_host() {
    let mut client = Client::start(Config::default());

    client
        .send(json!({
            "requestId": 1,
            "action": "register-script",
            "id": "keep-me",
            "targetUrl": "https://www.foo.com",
            "code": "window.kept = true"
        }))
        .await;
    assert_eq!(client.next().await["response"]["success"], true);

    client.send_raw(b"{not json").await;
    let frame = client.next().await;
    assert!(frame.get("requestId").is_none());
    assert_eq!(frame["response"]["success"], false);
    assert!(frame["response"]["error"]
        .as_str()
        .unwrap()
        .starts_with("Malformed message"));

    client
        .send(json!({"requestId": 2, "action": "list-registered"}))
        .await;
    let frame = client.next().await;
    assert_eq!(frame["requestId"], 2);
    assert_eq!(frame["response"]["scripts"][0]["id"], "keep-me");

    client.close().await;
}

#[tokio::test]
async fn many_requests_keep_being_answered() {
    let mut client = Client::start(Config::default());

    for i in 0..64 {
        client
            .send(json!({"requestId": i, "action": "check-capability"}))
            .await;
        assert_eq!(client.next().await["requestId"], i);
    }

    client.close().await;
}

#[tokio::test]
async fn truncated_header_ends_the_host_with_an_error() {
    let (mut to_host, host_in) = tokio::io::duplex(64);
    let (host_out, _from_host) = tokio::io::duplex(64);
    let config = Config::default();
    let host = tokio::spawn(async move { host::serve(host_in, host_out, &config).await });

    to_host.write_all(&[3u8, 0]).await.unwrap();
    drop(to_host);

    assert!(host.await.unwrap().is_err());
}

#[tokio::test]
async fn host_stops_cleanly_on_eof() {
    let client = Client::start(Config::default());
    client.close().await;
}
