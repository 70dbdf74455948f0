//! Configuration module for Reelcast.
//!
//! Handles loading application settings and HeyGen generation settings.

mod heygen;
mod settings;

pub use heygen::{HeygenProfile, HeygenSettings, HEYGEN_API_KEY_ENV, HEYGEN_SETTINGS_FILE};
pub use settings::{
    GeneralSettings, HeygenSection, PollerSettings, RetrySettings, Settings, SpeechSettings,
    YoutubeSettings,
};
