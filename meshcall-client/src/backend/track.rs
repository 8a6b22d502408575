use meshcall_core::TrackKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use uuid::Uuid;

struct TrackInner {
    id: String,
    kind: TrackKind,
    label: String,
    device_id: Option<String>,
    stopped: AtomicBool,
    ended: watch::Sender<bool>,
}

/// A captured outbound track. Clones refer to the same capture.
#[derive(Clone)]
pub struct LocalTrack {
    inner: Arc<TrackInner>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>, device_id: Option<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), kind, label, device_id)
    }

    pub fn with_id(
        id: impl Into<String>,
        kind: TrackKind,
        label: impl Into<String>,
        device_id: Option<String>,
    ) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                kind,
                label: label.into(),
                device_id,
                stopped: AtomicBool::new(false),
                ended,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn device_id(&self) -> Option<&str> {
        self.inner.device_id.as_deref()
    }

    /// Releases the capture device.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.ended.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Called by the capture backend when the source goes away on its own,
    /// e.g. the user pressed the OS "stop sharing" button.
    pub fn end(&self) {
        self.inner.ended.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.inner.ended.borrow()
    }

    /// Resolves once the track has ended or was stopped.
    pub async fn ended(&self) {
        let mut rx = self.inner.ended.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }
}

impl PartialEq for LocalTrack {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("device_id", &self.inner.device_id)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// An inbound track as reported by the peer connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
    /// Ids of the tracks sharing this track's remote stream, itself excluded.
    pub stream_peers: Vec<RemoteTrackRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrackRef {
    pub id: String,
    pub kind: TrackKind,
}

impl RemoteTrack {
    pub fn has_paired_audio(&self) -> bool {
        self.stream_peers.iter().any(|t| t.kind == TrackKind::Audio)
    }
}
