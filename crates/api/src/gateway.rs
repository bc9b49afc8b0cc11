//! Realtime gateway.
//!
//! Terminates WebSocket connections, authenticates them during the
//! handshake, bridges inbound events to the message service, and pushes
//! persisted results to the correct recipients.
//!
//! Per connection the lifecycle is Connecting -> Authenticated -> Active ->
//! Disconnected: token verification happens before the upgrade completes, so
//! no event is processed on an unauthenticated socket. Inbound events are
//! handled one at a time in arrival order; a `joinGroup` is therefore always
//! acknowledged before any later send from the same connection is looked at.
//!
//! Delivery is at-most-once, best-effort: events for users without a
//! registered connection are dropped. The message itself is durable either
//! way, so a later history read surfaces it.

#![allow(missing_docs)]

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use huddle_common::AppResult;
use huddle_core::{AuthIdentity, SendDirectMessageInput, SendGroupMessageInput};
use huddle_db::entities::{direct_message, group_message};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::middleware::AppState;
use crate::registry::{ConnectionHandle, ConnectionRegistry};

/// Gateway handshake query parameters.
#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    /// Bearer credential.
    pub token: String,
}

/// Client-to-server event.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join a group's delivery room.
    #[serde(rename_all = "camelCase")]
    JoinGroup { group_id: String },
    /// Leave a group's delivery room.
    #[serde(rename_all = "camelCase")]
    LeaveGroup { group_id: String },
    /// Send a direct message.
    SendDirectMessage(SendDirectMessageInput),
    /// Send a group message.
    SendGroupMessage(SendGroupMessageInput),
    /// Mark all direct messages from a sender as seen.
    #[serde(rename_all = "camelCase")]
    MarkDirectSeen { sender_id: String },
    /// Mark a group's messages as seen.
    #[serde(rename_all = "camelCase")]
    MarkGroupSeen { group_id: String },
}

/// Server-to-client event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A direct message was persisted.
    NewDirectMessage(direct_message::Model),
    /// A group message was persisted.
    NewGroupMessage(group_message::Model),
    /// Direct messages were marked as seen.
    #[serde(rename_all = "camelCase")]
    MessagesMarkedAsSeen {
        sender_id: String,
        receiver_id: String,
    },
    /// Group messages were marked as seen.
    #[serde(rename_all = "camelCase")]
    GroupMessagesMarkedAsSeen { group_id: String, user_id: String },
    /// The online-user set changed.
    UpdateOnlineUsers { users: Vec<String> },
    /// Room join confirmed; sends into the room are accepted from here on.
    #[serde(rename_all = "camelCase")]
    JoinedGroup { group_id: String },
    /// Room leave confirmed.
    #[serde(rename_all = "camelCase")]
    LeftGroup { group_id: String },
    /// A send failed; pushed to the originating connection only.
    SendMessageError { reason: String },
    /// A mark-seen failed; pushed to the originating connection only.
    MarkSeenError { reason: String },
}

/// An event scoped to a group's delivery room.
#[derive(Debug, Clone)]
pub struct GroupEvent {
    pub group_id: String,
    /// Connection that caused the event; it already received a direct copy.
    pub origin: Option<String>,
    pub event: ServerEvent,
}

/// Shared gateway state.
#[derive(Clone)]
pub struct GatewayState {
    /// Who is connected, and how to reach them.
    pub registry: Arc<ConnectionRegistry>,
    /// Broadcast channel carrying room-scoped events; each connection
    /// filters against its own joined-room set.
    pub group_tx: broadcast::Sender<GroupEvent>,
}

impl GatewayState {
    /// Create a new gateway state.
    #[must_use]
    pub fn new() -> Self {
        let (group_tx, _) = broadcast::channel(1000);
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            group_tx,
        }
    }
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket handler for the gateway.
///
/// The bearer token is verified before the upgrade completes; a bad
/// credential rejects the connection without processing any event.
pub async fn gateway_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<GatewayQuery>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let identity = state.auth_service.verify_token(&query.token).await?;

    info!(user_id = %identity.id, "Gateway connection authenticated");

    Ok(ws.on_upgrade(move |socket| handle_connection(socket, identity, state)))
}

/// Drive one authenticated connection until it disconnects.
async fn handle_connection(socket: WebSocket, identity: AuthIdentity, state: AppState) {
    let connection_id = ulid::Ulid::new().to_string().to_lowercase();
    let (mut sender, mut receiver) = socket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Subscribe before registering so the connection observes its own
    // appearance in the online set.
    let mut online_rx = state.gateway.registry.subscribe_online();
    let mut group_rx = state.gateway.group_tx.subscribe();

    state.gateway.registry.register(
        &identity.id,
        ConnectionHandle {
            connection_id: connection_id.clone(),
            tx: outbound_tx,
        },
    );

    info!(user_id = %identity.id, connection_id = %connection_id, "Gateway connection active");

    // Rooms this connection has joined; local to the connection task
    let mut joined_rooms: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            // Inbound events, one at a time in arrival order
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => {
                                let replies = handle_client_event(
                                    event,
                                    &identity,
                                    &state,
                                    &connection_id,
                                    &mut joined_rooms,
                                )
                                .await;

                                let mut closed = false;
                                for reply in replies {
                                    if send_event(&mut sender, &reply).await.is_err() {
                                        closed = true;
                                        break;
                                    }
                                }
                                if closed {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Unparseable gateway event");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Gateway socket error");
                        break;
                    }
                }
            }

            // Events routed directly to this user
            Some(event) = outbound_rx.recv() => {
                if send_event(&mut sender, &event).await.is_err() {
                    break;
                }
            }

            // Online-set updates
            online = online_rx.recv() => {
                match online {
                    Ok(users) => {
                        let event = ServerEvent::UpdateOnlineUsers { users };
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(lagged = n, "Online updates lagged; next snapshot wins");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Room-scoped events, filtered by this connection's joined set
            group_event = group_rx.recv() => {
                match group_event {
                    Ok(group_event) => {
                        if joined_rooms.contains(&group_event.group_id)
                            && group_event.origin.as_deref() != Some(connection_id.as_str())
                            && send_event(&mut sender, &group_event.event).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(lagged = n, "Group events lagged; dropped for this connection");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Stale unregistration (a newer connection took over) is a no-op
    state.gateway.registry.unregister(&connection_id);

    info!(user_id = %identity.id, connection_id = %connection_id, "Gateway connection closed");
}

async fn send_event(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), ()> {
    let json = serde_json::to_string(event).unwrap_or_default();
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Handle one inbound event. Returns the events to push back to the
/// originating connection, in order.
async fn handle_client_event(
    event: ClientEvent,
    identity: &AuthIdentity,
    state: &AppState,
    connection_id: &str,
    joined_rooms: &mut HashSet<String>,
) -> Vec<ServerEvent> {
    match event {
        ClientEvent::JoinGroup { group_id } => {
            // Re-validated against current membership, not trusted from the
            // client
            match state.message_service.is_group_member(&group_id, &identity.id).await {
                Ok(true) => {
                    joined_rooms.insert(group_id.clone());
                    debug!(user_id = %identity.id, group_id = %group_id, "Joined room");
                    vec![ServerEvent::JoinedGroup { group_id }]
                }
                Ok(false) => vec![ServerEvent::SendMessageError {
                    reason: "Not a member of this group".to_string(),
                }],
                Err(e) => vec![ServerEvent::SendMessageError {
                    reason: e.to_string(),
                }],
            }
        }

        ClientEvent::LeaveGroup { group_id } => {
            joined_rooms.remove(&group_id);
            debug!(user_id = %identity.id, group_id = %group_id, "Left room");
            vec![ServerEvent::LeftGroup { group_id }]
        }

        ClientEvent::SendDirectMessage(input) => {
            match state.message_service.send_direct(&identity.id, input).await {
                Ok(message) => {
                    // Push to the receiver if they are currently connected;
                    // otherwise the event is dropped and the durable row
                    // surfaces on their next page read
                    deliver_to_user(
                        &state.gateway.registry,
                        &message.receiver_id,
                        ServerEvent::NewDirectMessage(message.clone()),
                    );

                    // Read-your-own-write confirmation
                    vec![ServerEvent::NewDirectMessage(message)]
                }
                Err(e) => vec![ServerEvent::SendMessageError {
                    reason: e.to_string(),
                }],
            }
        }

        ClientEvent::SendGroupMessage(input) => {
            match state.message_service.send_group(&identity.id, input).await {
                Ok(message) => {
                    let event = ServerEvent::NewGroupMessage(message.clone());

                    // Everyone joined to the room except this connection,
                    // which gets its confirmation below
                    let _ = state.gateway.group_tx.send(GroupEvent {
                        group_id: message.group_id.clone(),
                        origin: Some(connection_id.to_string()),
                        event: event.clone(),
                    });

                    vec![event]
                }
                Err(e) => vec![ServerEvent::SendMessageError {
                    reason: e.to_string(),
                }],
            }
        }

        ClientEvent::MarkDirectSeen { sender_id } => {
            match state
                .message_service
                .mark_direct_seen(&identity.id, &sender_id)
                .await
            {
                Ok(_) => {
                    // One aggregate notification to the original sender only
                    deliver_to_user(
                        &state.gateway.registry,
                        &sender_id,
                        ServerEvent::MessagesMarkedAsSeen {
                            sender_id: sender_id.clone(),
                            receiver_id: identity.id.clone(),
                        },
                    );
                    vec![]
                }
                Err(e) => vec![ServerEvent::MarkSeenError {
                    reason: e.to_string(),
                }],
            }
        }

        ClientEvent::MarkGroupSeen { group_id } => {
            match state
                .message_service
                .mark_group_seen(&identity.id, &group_id)
                .await
            {
                Ok(_) => vec![ServerEvent::GroupMessagesMarkedAsSeen {
                    group_id,
                    user_id: identity.id.clone(),
                }],
                Err(e) => vec![ServerEvent::MarkSeenError {
                    reason: e.to_string(),
                }],
            }
        }
    }
}

/// Push an event to a user's current connection, dropping it if they are
/// offline or the connection is mid-teardown.
fn deliver_to_user(registry: &ConnectionRegistry, user_id: &str, event: ServerEvent) {
    if let Some(handle) = registry.lookup(user_id) {
        if handle.tx.send(event).is_err() {
            debug!(user_id = %user_id, "Connection closing; push dropped");
        }
    } else {
        debug!(user_id = %user_id, "User offline; push dropped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use huddle_db::entities::direct_message::MessageKind;

    #[test]
    fn test_client_event_parsing() {
        let json = r#"{"type":"sendDirectMessage","body":{"receiverId":"u2","message":"hi"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();

        match event {
            ClientEvent::SendDirectMessage(input) => {
                assert_eq!(input.receiver_id, "u2");
                assert_eq!(input.message, "hi");
                assert_eq!(input.message_type, MessageKind::Text);
            }
            _ => panic!("Expected sendDirectMessage"),
        }
    }

    #[test]
    fn test_join_group_parsing() {
        let json = r#"{"type":"joinGroup","body":{"groupId":"g1"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ClientEvent::JoinGroup { group_id } if group_id == "g1"));
    }

    #[test]
    fn test_server_event_serialization() {
        let message = direct_message::Model {
            id: "m1".to_string(),
            sender_id: "a".to_string(),
            sender_name: "Alice".to_string(),
            receiver_id: "b".to_string(),
            receiver_name: "Bob".to_string(),
            body: "hi".to_string(),
            message_type: MessageKind::Text,
            file_url: None,
            seen: false,
            created_at: Utc::now().into(),
        };

        let json = serde_json::to_string(&ServerEvent::NewDirectMessage(message)).unwrap();
        assert!(json.contains("\"type\":\"newDirectMessage\""));
        assert!(json.contains("\"senderId\":\"a\""));
        assert!(json.contains("\"seen\":false"));
    }

    #[test]
    fn test_online_users_serialization() {
        let event = ServerEvent::UpdateOnlineUsers {
            users: vec!["u1".to_string(), "u2".to_string()],
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"updateOnlineUsers\""));
        assert!(json.contains("\"users\":[\"u1\",\"u2\"]"));
    }

    #[test]
    fn test_seen_notification_serialization() {
        let event = ServerEvent::MessagesMarkedAsSeen {
            sender_id: "a".to_string(),
            receiver_id: "b".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"messagesMarkedAsSeen\""));
        assert!(json.contains("\"senderId\":\"a\""));
        assert!(json.contains("\"receiverId\":\"b\""));
    }
}
