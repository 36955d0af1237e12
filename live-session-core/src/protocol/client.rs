use serde::Serialize;

use crate::models::audio_models::WireAudioBlob;
use crate::models::config::SessionConfiguration;

/// First message on a new connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub input_audio_transcription: TranscriptionConfig,
    pub output_audio_transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPart {
    pub text: String,
}

/// Enables transcription; serialises as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptionConfig {}

impl SetupMessage {
    pub fn from_config(config: &SessionConfiguration) -> Self {
        Self {
            setup: Setup {
                model: config.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: config.voice_name.clone(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![TextPart {
                        text: config.system_instruction.clone(),
                    }],
                },
                input_audio_transcription: TranscriptionConfig::default(),
                output_audio_transcription: TranscriptionConfig::default(),
            },
        }
    }
}

/// One chunk of streamed student audio.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<WireAudioBlob>,
}

impl RealtimeInputMessage {
    pub fn audio(blob: &WireAudioBlob) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![blob.clone()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setup_shape() {
        let config = SessionConfiguration {
            model: "models/coach".into(),
            voice_name: "Zephyr".into(),
            system_instruction: "Be kind.".into(),
            ..Default::default()
        };

        let value = serde_json::to_value(SetupMessage::from_config(&config)).unwrap();

        assert_eq!(
            value,
            json!({
                "setup": {
                    "model": "models/coach",
                    "generationConfig": {
                        "responseModalities": ["AUDIO"],
                        "speechConfig": {
                            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Zephyr" } }
                        }
                    },
                    "systemInstruction": { "parts": [{ "text": "Be kind." }] },
                    "inputAudioTranscription": {},
                    "outputAudioTranscription": {}
                }
            })
        );
    }

    #[test]
    fn realtime_input_shape() {
        let blob = WireAudioBlob {
            mime_type: "audio/pcm;rate=16000".into(),
            data: "AAAA".into(),
        };
        let value = serde_json::to_value(RealtimeInputMessage::audio(&blob)).unwrap();

        assert_eq!(
            value,
            json!({
                "realtimeInput": {
                    "mediaChunks": [{ "mimeType": "audio/pcm;rate=16000", "data": "AAAA" }]
                }
            })
        );
    }
}
