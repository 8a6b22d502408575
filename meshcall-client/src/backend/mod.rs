//! Seams to the platform's WebRTC and capture APIs.
//!
//! The engine never touches a concrete WebRTC stack; a browser binding, a
//! native stack or a test double plugs in behind these traits. The native
//! `webrtc` stack ships behind the default `webrtc` feature.

mod media_devices;
mod peer_connection;
mod track;
#[cfg(feature = "webrtc")]
mod webrtc_backend;

pub use media_devices::*;
pub use peer_connection::*;
pub use track::*;
#[cfg(feature = "webrtc")]
pub use webrtc_backend::*;
