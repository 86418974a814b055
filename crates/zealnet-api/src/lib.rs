// zealnet-api: Async transport for the ZealNet portal (REST endpoints + WebSocket)

pub mod error;
pub mod rest;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use rest::PortalClient;
pub use tokio_tungstenite::Connector as TlsConnector;
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{
    Backoff, ConnectionState, ReconnectConfig, ReconnectTracker, SocketEvent, SocketHandle,
    SocketMessage,
};
