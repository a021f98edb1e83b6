//! WebSocket server implementation.
//!
//! Accepts WebSocket connections at `/ws` and lets clients subscribe to the
//! `registration` and `contract` topics. Events are delivered via broadcast
//! channels and filtered per client.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use chainvote_contract::LoggedEvent;
use chainvote_types::Timestamp;
use chainvote_workflow::RegistrationEvent;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::subscriptions::{
    ClientMessage, ClientSubscriptions, ServerMessage, SubscriptionEvent, SubscriptionFilter,
    SubscriptionTopic,
};
use crate::WsError;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Broadcast channels for each topic, carrying serialized
/// [`SubscriptionEvent`]s.
pub struct WsState {
    pub registration_tx: broadcast::Sender<String>,
    pub contract_tx: broadcast::Sender<String>,
}

impl WsState {
    pub fn new(channel_capacity: usize) -> Self {
        let (registration_tx, _) = broadcast::channel(channel_capacity);
        let (contract_tx, _) = broadcast::channel(channel_capacity);
        Self {
            registration_tx,
            contract_tx,
        }
    }

    pub fn sender_for(&self, topic: &SubscriptionTopic) -> &broadcast::Sender<String> {
        match topic {
            SubscriptionTopic::Registration => &self.registration_tx,
            SubscriptionTopic::Contract => &self.contract_tx,
        }
    }

    fn publish(&self, topic: SubscriptionTopic, data: impl Serialize) {
        let data = match serde_json::to_value(data) {
            Ok(v) => v,
            Err(e) => {
                warn!(%topic, error = %e, "unserializable event dropped");
                return;
            }
        };
        let event = SubscriptionEvent {
            topic,
            data,
            timestamp: Timestamp::now().as_secs(),
        };
        if let Ok(text) = serde_json::to_string(&event) {
            // No subscribers is not an error.
            let _ = self.sender_for(&topic).send(text);
        }
    }

    pub fn publish_registration(&self, event: &RegistrationEvent) {
        self.publish(SubscriptionTopic::Registration, event);
    }

    pub fn publish_contract(&self, event: &LoggedEvent) {
        self.publish(SubscriptionTopic::Contract, event);
    }
}

/// The WebSocket server, configured with a bind address and shared state.
pub struct WebSocketServer {
    pub addr: SocketAddr,
    pub state: Arc<WsState>,
}

impl WebSocketServer {
    pub fn with_state(addr: SocketAddr, state: Arc<WsState>) -> Self {
        Self { addr, state }
    }

    pub fn router(state: Arc<WsState>) -> Router {
        Router::new().route("/ws", get(ws_handler)).with_state(state)
    }

    /// Serve until `shutdown` fires.
    pub async fn start(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), WsError> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "WebSocket server listening");
        axum::serve(listener, Self::router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;
        Ok(())
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// What the connection loop must do after a client message.
#[derive(Debug, PartialEq, Eq)]
enum Forwarding {
    Start(SubscriptionTopic, Option<SubscriptionFilter>),
    Stop(SubscriptionTopic),
    Nothing,
}

/// Update `subs` for `text` and decide the reply.
fn apply_client_message(
    text: &str,
    subs: &mut ClientSubscriptions,
) -> (ServerMessage, Forwarding) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return (
                ServerMessage::Error {
                    message: format!("Invalid message: {e}"),
                },
                Forwarding::Nothing,
            )
        }
    };

    match msg {
        ClientMessage::Subscribe { topic, filter } => {
            subs.subscribe(topic, filter.clone());
            (
                ServerMessage::Ack {
                    action: "subscribe".into(),
                    topic,
                },
                Forwarding::Start(topic, filter),
            )
        }
        ClientMessage::Unsubscribe { topic } => {
            if subs.unsubscribe(&topic) {
                (
                    ServerMessage::Ack {
                        action: "unsubscribe".into(),
                        topic,
                    },
                    Forwarding::Stop(topic),
                )
            } else {
                (
                    ServerMessage::Error {
                        message: format!("Not subscribed to {topic}"),
                    },
                    Forwarding::Nothing,
                )
            }
        }
        ClientMessage::Ping => (ServerMessage::Pong, Forwarding::Nothing),
    }
}

async fn send_json(sender: &WsSender, msg: &ServerMessage) -> bool {
    let Ok(text) = serde_json::to_string(msg) else {
        return true;
    };
    sender.lock().await.send(Message::Text(text)).await.is_ok()
}

/// Handle a single WebSocket connection.
///
/// Each active subscription gets a forwarder task reading the topic's
/// broadcast channel; all of them are aborted when the client disconnects.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(ws_sender));

    let mut client_subs = ClientSubscriptions::new();
    let mut forwarders: HashMap<SubscriptionTopic, JoinHandle<()>> = HashMap::new();

    debug!("WebSocket client connected");

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "WebSocket receive error");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let (reply, forwarding) = apply_client_message(&text, &mut client_subs);
                match forwarding {
                    Forwarding::Start(topic, filter) => {
                        if let Some(old) = forwarders.remove(&topic) {
                            old.abort();
                        }
                        let rx = state.sender_for(&topic).subscribe();
                        let sender = ws_sender.clone();
                        let handle = tokio::spawn(forward_events(rx, sender, topic, filter));
                        forwarders.insert(topic, handle);
                        debug!(%topic, "client subscribed");
                    }
                    Forwarding::Stop(topic) => {
                        if let Some(handle) = forwarders.remove(&topic) {
                            handle.abort();
                        }
                        debug!(%topic, "client unsubscribed");
                    }
                    Forwarding::Nothing => {}
                }
                if !send_json(&ws_sender, &reply).await {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Ping(data) => {
                let _ = ws_sender.lock().await.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }

    for (_, handle) in forwarders.drain() {
        handle.abort();
    }
    debug!("WebSocket client disconnected");
}

/// Forwarder task: reads events from a broadcast receiver and sends matching
/// ones to the client.
async fn forward_events(
    mut rx: broadcast::Receiver<String>,
    ws_sender: WsSender,
    topic: SubscriptionTopic,
    filter: Option<SubscriptionFilter>,
) {
    let mut matcher = ClientSubscriptions::new();
    matcher.subscribe(topic, filter);

    loop {
        match rx.recv().await {
            Ok(text) => {
                let wanted = match serde_json::from_str::<SubscriptionEvent>(&text) {
                    Ok(event) => matcher.matches_filter(&topic, &event),
                    Err(_) => false,
                };
                if wanted && ws_sender.lock().await.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(%topic, skipped = n, "client lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
