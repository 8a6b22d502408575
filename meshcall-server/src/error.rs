use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room store backend unavailable: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid join request: {0}")]
    InvalidJoin(&'static str),

    #[error("room {0} is not accepting commands")]
    RoomUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
