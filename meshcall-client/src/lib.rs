pub mod backend;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod media;
pub mod transport;

pub use client::*;
pub use config::*;
pub use engine::{CallEvent, LinkState, RemoteMediaKind, SessionManager};
pub use error::*;
pub use media::{LocalMediaState, LocalStream, MediaController};
pub use transport::{SignalingTransport, TransportEvent, WsTransport};
