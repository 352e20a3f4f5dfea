use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::types::Update;

/// Notifications emitted by the client task, in the order requests were issued
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// a connection to the server was established
    Connected(SocketAddr),
    /// a request completed successfully
    Update(Update),
    /// a request or the connection attempt failed
    Error(String),
}

/// Receiving side of the event stream returned by [`crate::spawn_client_task`]
pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

impl std::fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ClientEvent::Connected(addr) => write!(f, "connected to {addr}"),
            ClientEvent::Update(update) => write!(f, "{update}"),
            ClientEvent::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}
