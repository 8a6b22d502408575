pub mod broker;
pub mod config;
pub mod error;
pub mod hub;
pub mod room;
pub mod signaling;
pub mod store;

pub use broker::*;
pub use config::*;
pub use error::*;
pub use hub::*;
pub use room::*;
pub use signaling::*;
pub use store::*;
