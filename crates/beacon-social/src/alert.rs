//! Alert codes: named presets that broadcast an attention-grabbing message.
//!
//! A code carries a color, a tone and a mode. `Alert` codes only notify;
//! `Call` codes also open the call on the sender's side and show an invite
//! on everyone else's.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Color used when a code is created with an unparseable color.
pub const DEFAULT_ALERT_COLOR: &str = "#ff3b30";

/// Length of one tone in a pattern.
pub const TONE_LENGTH: Duration = Duration::from_millis(220);

/// Distance between tone starts in a pattern.
pub const TONE_SPACING: Duration = Duration::from_millis(240);

/// What triggering a code does besides posting the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMode {
    #[default]
    Alert,
    Call,
}

/// Tone played on the receiving side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AlertSound {
    #[default]
    Sos,
    Ping,
    Soft,
}

impl From<String> for AlertSound {
    /// Unknown sound names fall back to `Sos`.
    fn from(name: String) -> Self {
        match name.as_str() {
            "ping" => Self::Ping,
            "soft" => Self::Soft,
            _ => Self::Sos,
        }
    }
}

/// One scheduled tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneStep {
    pub frequency_hz: u32,
    /// Start time relative to the first tone.
    pub offset: Duration,
    pub duration: Duration,
}

impl AlertSound {
    /// Frequencies of the pattern, in play order.
    pub fn pattern(&self) -> &'static [u32] {
        match self {
            Self::Sos => &[880, 880, 880, 660, 660, 660, 880, 880, 880],
            Self::Ping => &[880, 1320, 880],
            Self::Soft => &[440, 550, 440],
        }
    }

    pub fn schedule(&self) -> Vec<ToneStep> {
        self.pattern()
            .iter()
            .zip(0u32..)
            .map(|(&frequency_hz, i)| ToneStep {
                frequency_hz,
                offset: TONE_SPACING * i,
                duration: TONE_LENGTH,
            })
            .collect()
    }

    /// Time from the first tone's start to the last tone's end.
    pub fn total_duration(&self) -> Duration {
        match self.schedule().last() {
            Some(step) => step.offset + step.duration,
            None => Duration::ZERO,
        }
    }
}

/// A reusable alert preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCode {
    pub id: String,
    pub name: String,
    pub mode: AlertMode,
    pub color: String,
    pub sound: AlertSound,
    pub text: String,
}

impl AlertCode {
    pub fn new(name: &str, mode: AlertMode, color: &str, sound: AlertSound, text: &str) -> Self {
        Self {
            id: beacon_common::prefixed_id("code"),
            name: name.trim().to_string(),
            mode,
            color: parse_hex_color(color).unwrap_or_else(|| DEFAULT_ALERT_COLOR.to_string()),
            sound,
            text: text.trim().to_string(),
        }
    }
}

/// Alert presets saved per room.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertCodeBook {
    codes: HashMap<String, Vec<AlertCode>>,
}

impl AlertCodeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a preset for a room. A preset with the same name (ignoring
    /// case) is replaced.
    pub fn save(&mut self, room_id: &str, code: AlertCode) -> &AlertCode {
        let codes = self.codes.entry(room_id.to_string()).or_default();
        let slot = match codes
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(&code.name))
        {
            Some(i) => {
                codes[i] = code;
                i
            }
            None => {
                codes.push(code);
                codes.len() - 1
            }
        };
        &codes[slot]
    }

    /// Presets of a room, in the order they were first saved.
    pub fn codes(&self, room_id: &str) -> &[AlertCode] {
        self.codes.get(room_id).map_or(&[], Vec::as_slice)
    }

    pub fn find(&self, room_id: &str, name: &str) -> Option<&AlertCode> {
        self.codes(room_id)
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn remove(&mut self, room_id: &str, code_id: &str) -> Option<AlertCode> {
        let codes = self.codes.get_mut(room_id)?;
        let i = codes.iter().position(|c| c.id == code_id)?;
        let code = codes.remove(i);
        if codes.is_empty() {
            self.codes.remove(room_id);
        }
        Some(code)
    }
}

/// Normalise `#rrggbb` / `rrggbb` to lowercase `#rrggbb`.
pub fn parse_hex_color(raw: &str) -> Option<String> {
    let hex = raw.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", hex.to_ascii_lowercase()))
}
