//! Newline-delimited JSON protocol spoken on the daemon socket.

use nback::clock::SessionEvent;
use nback::engine::StimulusFrame;
use nback::session::{SessionSnapshot, Verdict};
use nback::settings::Settings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    GetState,
    GetSettings,
    /// Replace the settings wholesale; absent fields take defaults.
    SetSettings {
        settings: Settings,
    },
    StartSession {
        #[serde(default)]
        settings: Option<Settings>,
    },
    StopSession,
    /// Claim a match in a zero-based box.
    Respond {
        box_index: usize,
    },
    /// Keybinding path: "1" claims a match in box 0.
    KeyPress {
        key: String,
    },
    ExportSettings,
    ImportSettings {
        token: String,
    },
    SetIntensity {
        intensity: u32,
    },
    SetThemePreset {
        preset: String,
    },
    /// Turn this connection into a stream of `Event` responses.
    Subscribe,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(clippy::large_enum_variant)]
pub enum Response {
    State(Box<SessionSnapshot>),
    Settings { settings: Settings },
    SettingsToken { token: String },
    Frame { frame: StimulusFrame },
    Verdict { verdict: Verdict, message: String },
    Event { event: SessionEvent },
    Success { message: String },
    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Response::Success {
            message: message.into(),
        }
    }
}
