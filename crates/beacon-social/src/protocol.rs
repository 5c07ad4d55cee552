//! Wire types exchanged over the room bus.
//!
//! Every bus message is an [`Envelope`]: a `type` tag, the sender's handle,
//! and a typed payload. The JSON shape is fixed because other peers parse
//! it verbatim:
//!
//! ```text
//! CHAT_MESSAGE  { senderHandle, payload: Message }
//! CALL_SIGNAL   { senderHandle, payload: { roomId, to, from, kind, sdp?, candidate? } }
//! CALL_PRESENCE { senderHandle, payload: { roomId, handle, inCall } }
//! ```

use serde::{Deserialize, Serialize};

use crate::chat::Message;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A single bus message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        sender_handle: String,
        payload: Message,
    },
    #[serde(rename_all = "camelCase")]
    CallSignal {
        sender_handle: String,
        payload: SignalPayload,
    },
    #[serde(rename_all = "camelCase")]
    CallPresence {
        sender_handle: String,
        payload: PresencePayload,
    },
}

/// Discriminant of an [`Envelope`], handy for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    ChatMessage,
    CallSignal,
    CallPresence,
}

impl Envelope {
    pub fn chat(sender_handle: impl Into<String>, payload: Message) -> Self {
        Self::ChatMessage {
            sender_handle: sender_handle.into(),
            payload,
        }
    }

    pub fn signal(sender_handle: impl Into<String>, payload: SignalPayload) -> Self {
        Self::CallSignal {
            sender_handle: sender_handle.into(),
            payload,
        }
    }

    pub fn presence(sender_handle: impl Into<String>, payload: PresencePayload) -> Self {
        Self::CallPresence {
            sender_handle: sender_handle.into(),
            payload,
        }
    }

    pub fn sender_handle(&self) -> &str {
        match self {
            Self::ChatMessage { sender_handle, .. }
            | Self::CallSignal { sender_handle, .. }
            | Self::CallPresence { sender_handle, .. } => sender_handle,
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::ChatMessage { .. } => EnvelopeKind::ChatMessage,
            Self::CallSignal { .. } => EnvelopeKind::CallSignal,
            Self::CallPresence { .. } => EnvelopeKind::CallPresence,
        }
    }

    /// Encode for a text transport.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

// ---------------------------------------------------------------------------
// Call signaling
// ---------------------------------------------------------------------------

/// An addressed negotiation message. Only the peer named in `to` acts on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPayload {
    pub room_id: String,
    pub to: String,
    pub from: String,
    #[serde(flatten)]
    pub signal: Signal,
}

/// The negotiation step carried by a [`SignalPayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Signal {
    /// SDP offer to establish (or renegotiate) a peer connection.
    Offer { sdp: String },
    /// SDP answer in response to an offer.
    Answer { sdp: String },
    /// ICE candidate for NAT traversal.
    Ice { candidate: IceCandidate },
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Ice { .. } => "ice",
        }
    }
}

/// A network path descriptor, as produced by the local ICE agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        default,
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// A peer's self-reported call membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub room_id: String,
    pub handle: String,
    pub in_call: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn presence_envelope_wire_shape() {
        let env = Envelope::presence(
            "amy",
            PresencePayload {
                room_id: "r1".into(),
                handle: "amy".into(),
                in_call: true,
            },
        );
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "CALL_PRESENCE",
                "senderHandle": "amy",
                "payload": { "roomId": "r1", "handle": "amy", "inCall": true }
            })
        );
    }

    #[test]
    fn offer_signal_wire_shape() {
        let env = Envelope::signal(
            "zed",
            SignalPayload {
                room_id: "r1".into(),
                to: "amy".into(),
                from: "zed".into(),
                signal: Signal::Offer { sdp: "v=0".into() },
            },
        );
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["type"], "CALL_SIGNAL");
        assert_eq!(value["payload"]["kind"], "offer");
        assert_eq!(value["payload"]["sdp"], "v=0");
        assert_eq!(value["payload"]["to"], "amy");
        assert!(value["payload"].get("candidate").is_none());
    }

    #[test]
    fn ice_signal_parses_from_browser_shape() {
        let raw = json!({
            "type": "CALL_SIGNAL",
            "senderHandle": "amy",
            "payload": {
                "roomId": "r1",
                "to": "zed",
                "from": "amy",
                "kind": "ice",
                "candidate": {
                    "candidate": "candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host",
                    "sdpMid": "0",
                    "sdpMLineIndex": 0
                }
            }
        });
        let env: Envelope = serde_json::from_value(raw).unwrap();
        assert_eq!(env.kind(), EnvelopeKind::CallSignal);
        assert_eq!(env.sender_handle(), "amy");
        let Envelope::CallSignal { payload, .. } = env else {
            panic!("expected a call signal");
        };
        let Signal::Ice { candidate } = payload.signal else {
            panic!("expected an ice signal");
        };
        assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.sdp_m_line_index, Some(0));
    }

    #[test]
    fn text_encoding_is_lossless() {
        let env = Envelope::presence(
            "zed",
            PresencePayload {
                room_id: "r1".into(),
                handle: "zed".into(),
                in_call: false,
            },
        );
        let raw = env.to_json().unwrap();
        assert!(raw.contains("\"type\":\"CALL_PRESENCE\""));
        assert_eq!(Envelope::from_json(&raw).unwrap(), env);
    }

    #[test]
    fn unknown_envelope_type_is_rejected() {
        let raw = json!({ "type": "CALL_RING", "senderHandle": "amy", "payload": {} });
        assert!(serde_json::from_value::<Envelope>(raw).is_err());
    }
}
