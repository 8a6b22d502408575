use crate::backend::{RemoteTrack, TransceiverId, TransceiverSlot};
use crate::engine::RemoteMediaKind;
use meshcall_core::TrackKind;
use std::collections::HashSet;

const SCREEN_LABEL_HINTS: [&str; 5] = ["screen", "window", "display", "monitor", "tab"];

/// Decides whether an inbound video track is a camera or a screen share.
///
/// Sources in order of trust: the transceiver it arrived on, track ids the
/// sender announced in `screen-start`, then label text and whether the track
/// travels with an audio track.
pub fn classify_remote_track(
    track: &RemoteTrack,
    transceiver: Option<TransceiverId>,
    announced_screens: &HashSet<String>,
) -> RemoteMediaKind {
    if track.kind == TrackKind::Audio {
        return RemoteMediaKind::Audio;
    }

    match transceiver.and_then(TransceiverSlot::from_transceiver) {
        Some(TransceiverSlot::Screen) => return RemoteMediaKind::Screen,
        Some(TransceiverSlot::Camera) => return RemoteMediaKind::Camera,
        // Video on the audio slot says nothing.
        Some(TransceiverSlot::Audio) | None => {}
    }

    if announced_screens.contains(&track.id) {
        return RemoteMediaKind::Screen;
    }

    if looks_like_screen(&track.label) {
        return RemoteMediaKind::Screen;
    }

    if !track.stream_peers.is_empty() && !track.has_paired_audio() {
        return RemoteMediaKind::Screen;
    }

    RemoteMediaKind::Camera
}

fn looks_like_screen(label: &str) -> bool {
    let label = label.to_lowercase();
    SCREEN_LABEL_HINTS.iter().any(|hint| label.contains(hint))
}
