//! Integration tests over real TCP sockets
//!
//! A relay is bound on an ephemeral loopback port and driven with raw
//! line connections and with the client endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use chat_relay::{Client, Connection, Event, Identity, Registry, Server};

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    addr: SocketAddr,
    registry: Registry,
    events: mpsc::UnboundedReceiver<Event>,
    _stop: oneshot::Sender<()>,
}

async fn start_relay() -> Harness {
    let (tx, events) = mpsc::unbounded_channel();
    let server = Server::bind("127.0.0.1:0", Arc::new(tx)).await.unwrap();
    let addr = server.local_addr().unwrap();
    let registry = server.registry().clone();
    let (stop, stopped) = oneshot::channel::<()>();

    tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));

    Harness {
        addr,
        registry,
        events,
        _stop: stop,
    }
}

impl Harness {
    async fn connect(&self, identity: &str) -> Connection {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        let mut conn = Connection::new(stream);
        conn.send(identity).await.unwrap();
        conn
    }

    /// Wait for the presence list to read exactly `expected`
    async fn wait_for_presence(&mut self, expected: &[&str]) {
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        loop {
            let event = timeout(WAIT, self.events.recv()).await.unwrap().unwrap();
            if event == (Event::Presence { identities: expected.clone() }) {
                return;
            }
        }
    }

    async fn names(&self) -> Vec<String> {
        self.registry
            .snapshot()
            .await
            .into_iter()
            .map(|i| i.to_string())
            .collect()
    }
}

async fn next_line(conn: &mut Connection) -> Option<String> {
    timeout(WAIT, conn.receive()).await.unwrap().unwrap()
}

#[tokio::test]
async fn typing_goes_to_others_chat_goes_to_everyone() {
    let mut relay = start_relay().await;

    let mut alice = relay.connect("Alice").await;
    relay.wait_for_presence(&["Alice"]).await;
    let mut bob = relay.connect("Bob").await;
    relay.wait_for_presence(&["Alice", "Bob"]).await;
    assert_eq!(relay.names().await, vec!["Alice", "Bob"]);

    alice.send("typing:Alice").await.unwrap();
    assert_eq!(next_line(&mut bob).await.as_deref(), Some("typing:Alice"));

    alice.send("Alice: hello").await.unwrap();
    // Documented current behavior: the sender gets its own chat back,
    // and nothing before it (no typing echo)
    assert_eq!(next_line(&mut alice).await.as_deref(), Some("Alice: hello"));
    assert_eq!(next_line(&mut bob).await.as_deref(), Some("Alice: hello"));

    alice.send("stopTyping").await.unwrap();
    assert_eq!(next_line(&mut bob).await.as_deref(), Some("stopTyping"));

    // Alice never saw the stop notice either
    bob.send("Bob: bye").await.unwrap();
    assert_eq!(next_line(&mut alice).await.as_deref(), Some("Bob: bye"));
}

#[tokio::test]
async fn abrupt_disconnect_leaves_others_working() {
    let mut relay = start_relay().await;

    let mut alice = relay.connect("Alice").await;
    relay.wait_for_presence(&["Alice"]).await;
    let bob = relay.connect("Bob").await;
    relay.wait_for_presence(&["Alice", "Bob"]).await;

    drop(bob);
    relay.wait_for_presence(&["Alice"]).await;

    alice.send("Alice: anyone left?").await.unwrap();
    assert_eq!(
        next_line(&mut alice).await.as_deref(),
        Some("Alice: anyone left?")
    );
    assert_eq!(relay.names().await, vec!["Alice"]);

    // The acceptor still takes new connections
    let mut carol = relay.connect("Carol").await;
    relay.wait_for_presence(&["Alice", "Carol"]).await;
    alice.send("Alice: hi Carol").await.unwrap();
    assert_eq!(next_line(&mut carol).await.as_deref(), Some("Alice: hi Carol"));
}

#[tokio::test]
async fn empty_identity_gets_default_name() {
    let mut relay = start_relay().await;

    let _anon = relay.connect("").await;

    relay.wait_for_presence(&["Anonymous"]).await;
    assert_eq!(relay.names().await, vec!["Anonymous"]);
}

#[tokio::test]
async fn chat_line_is_relayed_byte_identical() {
    let mut relay = start_relay().await;

    let mut alice = relay.connect("Alice").await;
    relay.wait_for_presence(&["Alice"]).await;
    let mut bob = relay.connect("Bob").await;
    relay.wait_for_presence(&["Alice", "Bob"]).await;

    let line = "Alice: ünïcödé  with: colons\tand tabs ";
    alice.send(line).await.unwrap();

    assert_eq!(next_line(&mut bob).await.as_deref(), Some(line));
}

#[tokio::test]
async fn client_endpoints_talk_through_relay() {
    let mut relay = start_relay().await;

    let (alice_tx, mut alice_events) = mpsc::unbounded_channel();
    let (bob_tx, mut bob_events) = mpsc::unbounded_channel();

    let mut alice = Client::connect(
        &relay.addr.to_string(),
        Identity::from_line("Alice"),
        Arc::new(alice_tx),
    )
    .await
    .unwrap();
    relay.wait_for_presence(&["Alice"]).await;
    let _bob = Client::connect(
        &relay.addr.to_string(),
        Identity::from_line("Bob"),
        Arc::new(bob_tx),
    )
    .await
    .unwrap();
    relay.wait_for_presence(&["Alice", "Bob"]).await;

    alice.notify_typing().await.unwrap();
    alice.send_chat("hello Bob").await.unwrap();

    let mut seen = Vec::new();
    while seen.len() < 4 {
        seen.push(timeout(WAIT, bob_events.recv()).await.unwrap().unwrap());
    }
    assert_eq!(seen[0], Event::status("Connected as Bob"));
    assert_eq!(
        seen[1],
        Event::Typing {
            sender: "Alice".to_string()
        }
    );
    assert_eq!(
        seen[2],
        Event::Display {
            text: "Alice: hello Bob".to_string(),
            local: false
        }
    );
    assert_eq!(seen[3], Event::StopTyping);

    // Alice's own line comes back flagged as local
    assert_eq!(
        timeout(WAIT, alice_events.recv()).await.unwrap().unwrap(),
        Event::status("Connected as Alice")
    );
    assert_eq!(
        timeout(WAIT, alice_events.recv()).await.unwrap().unwrap(),
        Event::Display {
            text: "Alice: hello Bob".to_string(),
            local: true
        }
    );

    alice.close().await;
    relay.wait_for_presence(&["Bob"]).await;
}

#[tokio::test]
async fn connect_error_is_reported() {
    // Grab a free port, then release it
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (tx, mut events) = mpsc::unbounded_channel();

    let result = Client::connect(&addr.to_string(), Identity::from_line("Alice"), Arc::new(tx)).await;

    assert!(matches!(result, Err(chat_relay::AppError::Connect { .. })));
    assert!(matches!(
        events.recv().await,
        Some(Event::Status { is_error: true, .. })
    ));
}
