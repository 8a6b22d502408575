//! Outbound screen-share encoding presets.

use crate::backend::EncodingParameters;
use meshcall_core::ScreenQuality;

impl From<ScreenQuality> for EncodingParameters {
    fn from(quality: ScreenQuality) -> Self {
        match quality {
            ScreenQuality::Low => EncodingParameters {
                max_bitrate_bps: 600_000,
                scale_resolution_down_by: 2.0,
            },
            ScreenQuality::Medium => EncodingParameters {
                max_bitrate_bps: 1_200_000,
                scale_resolution_down_by: 1.25,
            },
            ScreenQuality::High => EncodingParameters {
                max_bitrate_bps: 2_500_000,
                scale_resolution_down_by: 1.0,
            },
        }
    }
}
