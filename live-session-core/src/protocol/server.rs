use serde::Deserialize;

use crate::models::error::SessionError;

/// A single thing the remote told us, in the order it should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Setup accepted; the session is open.
    SetupComplete,
    InputTranscript(String),
    OutputTranscript(String),
    /// Base64 coach audio with its MIME type.
    Audio { mime_type: String, data: String },
    /// The student talked over the coach.
    Interrupted,
    TurnComplete,
    /// The remote will disconnect soon.
    GoAway { time_left: Option<String> },
    /// The remote reported a failure.
    Error(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    setup_complete: Option<serde_json::Value>,
    server_content: Option<ServerContent>,
    go_away: Option<GoAway>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    input_transcription: Option<Transcription>,
    output_transcription: Option<Transcription>,
    #[serde(default)]
    interrupted: bool,
    #[serde(default)]
    turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
struct Transcription {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoAway {
    time_left: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Parse one JSON message from the remote into events.
///
/// Within a message, events come out as: setup, transcripts (student then
/// coach), audio parts, interruption, turn completion, go-away, error.
/// Unknown fields are ignored; a message that is not a JSON object is a
/// protocol error.
pub fn parse_server_message(text: &str) -> Result<Vec<ServerEvent>, SessionError> {
    let message: ServerMessage = serde_json::from_str(text)
        .map_err(|e| SessionError::ProtocolError(format!("invalid server message: {e}")))?;

    let mut events = Vec::new();
    if message.setup_complete.is_some() {
        events.push(ServerEvent::SetupComplete);
    }

    if let Some(content) = message.server_content {
        if let Some(t) = content.input_transcription.filter(|t| !t.text.is_empty()) {
            events.push(ServerEvent::InputTranscript(t.text));
        }
        if let Some(t) = content.output_transcription.filter(|t| !t.text.is_empty()) {
            events.push(ServerEvent::OutputTranscript(t.text));
        }
        if let Some(turn) = content.model_turn {
            events.extend(turn.parts.into_iter().filter_map(|part| {
                part.inline_data.map(|inline| ServerEvent::Audio {
                    mime_type: inline.mime_type,
                    data: inline.data,
                })
            }));
        }
        if content.interrupted {
            events.push(ServerEvent::Interrupted);
        }
        if content.turn_complete {
            events.push(ServerEvent::TurnComplete);
        }
    }

    if let Some(go_away) = message.go_away {
        events.push(ServerEvent::GoAway {
            time_left: go_away.time_left,
        });
    }

    if let Some(error) = message.error {
        let detail = match error.status {
            Some(status) if !error.message.is_empty() => format!("{status}: {}", error.message),
            Some(status) => status,
            None => error.message,
        };
        events.push(ServerEvent::Error(detail));
    }

    Ok(events)
}
