/// Public STUN servers used when the hub does not push an ICE configuration.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Path the hub serves the signaling WebSocket on.
pub const DEFAULT_SIGNALING_PATH: &str = "/ws/signaling";

/// Milliseconds since the Unix epoch, used for chat timestamps and `lastSeen`.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
