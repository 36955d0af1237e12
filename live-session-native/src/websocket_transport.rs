//! WebSocket transport for the live conversation endpoint.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use live_session_core::models::audio_models::WireAudioBlob;
use live_session_core::models::config::SessionConfiguration;
use live_session_core::models::error::SessionError;
use live_session_core::protocol::{parse_server_message, RealtimeInputMessage, ServerEvent, SetupMessage};
use live_session_core::traits::transport::RealtimeTransport;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a single WebSocket message means for the session.
#[derive(Debug, PartialEq)]
enum Incoming {
    Events(Vec<ServerEvent>),
    /// The remote closed normally.
    Closed,
    /// Control frames with nothing for the session.
    Ignored,
}

fn translate(message: Message) -> Result<Incoming, SessionError> {
    match message {
        Message::Text(text) => parse_server_message(&text).map(Incoming::Events),
        Message::Binary(data) => {
            let text = std::str::from_utf8(&data)
                .map_err(|e| SessionError::ProtocolError(format!("binary message is not UTF-8: {e}")))?;
            parse_server_message(text).map(Incoming::Events)
        }
        Message::Close(Some(frame)) if frame.code != CloseCode::Normal => Err(SessionError::ConnectionError(
            format!("closed by remote ({}): {}", u16::from(frame.code), frame.reason),
        )),
        Message::Close(_) => Ok(Incoming::Closed),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(Incoming::Ignored),
    }
}

fn connection_error(context: &str, err: tungstenite::Error) -> SessionError {
    SessionError::ConnectionError(format!("{context}: {err}"))
}

/// [`RealtimeTransport`] over tokio-tungstenite.
pub struct WebSocketTransport {
    url: String,
    connect_timeout: Duration,
    stream: Option<Socket>,
    pending: VecDeque<ServerEvent>,
}

impl WebSocketTransport {
    pub fn new(config: &SessionConfiguration) -> Self {
        Self {
            url: config.connection_url(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stream: None,
            pending: VecDeque::new(),
        }
    }

    async fn handshake(&mut self, setup: &SetupMessage) -> Result<(), SessionError> {
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| connection_error("connect failed", e))?;
        let socket = self.stream.insert(socket);
        log::info!("websocket connected");

        let text = serde_json::to_string(setup)
            .map_err(|e| SessionError::ProtocolError(format!("failed to encode setup: {e}")))?;
        socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| connection_error("failed to send setup", e))?;

        loop {
            let message = match socket.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(connection_error("connection lost during setup", e)),
                None => {
                    return Err(SessionError::ConnectionError(
                        "remote closed before confirming setup".into(),
                    ))
                }
            };
            match translate(message)? {
                Incoming::Events(events) => {
                    let mut confirmed = false;
                    for event in events {
                        if event == ServerEvent::SetupComplete && !confirmed {
                            confirmed = true;
                        } else {
                            self.pending.push_back(event);
                        }
                    }
                    if confirmed {
                        log::debug!("setup confirmed");
                        return Ok(());
                    }
                }
                Incoming::Closed => {
                    return Err(SessionError::ConnectionError(
                        "remote closed before confirming setup".into(),
                    ))
                }
                Incoming::Ignored => {}
            }
        }
    }
}

#[async_trait]
impl RealtimeTransport for WebSocketTransport {
    async fn connect(&mut self, setup: &SetupMessage) -> Result<(), SessionError> {
        self.pending.clear();
        match tokio::time::timeout(self.connect_timeout, self.handshake(setup)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::ConnectionError(format!(
                "timed out after {:?} waiting for the remote",
                self.connect_timeout
            ))),
        }
    }

    async fn send_audio(&mut self, blob: &WireAudioBlob) -> Result<(), SessionError> {
        let Some(socket) = self.stream.as_mut() else {
            return Err(SessionError::ConnectionError("not connected".into()));
        };
        let text = serde_json::to_string(&RealtimeInputMessage::audio(blob))
            .map_err(|e| SessionError::ProtocolError(format!("failed to encode audio: {e}")))?;
        socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| connection_error("failed to send audio", e))
    }

    async fn next_event(&mut self) -> Option<Result<ServerEvent, SessionError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            let socket = self.stream.as_mut()?;
            let message = match socket.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(connection_error("connection lost", e))),
            };
            match translate(message) {
                Ok(Incoming::Events(events)) => self.pending.extend(events),
                Ok(Incoming::Closed) => return None,
                Ok(Incoming::Ignored) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.pending.clear();
        let Some(mut socket) = self.stream.take() else {
            return Ok(());
        };
        match socket.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                log::info!("websocket closed");
                Ok(())
            }
            Err(e) => Err(connection_error("close failed", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    #[test]
    fn text_is_parsed() {
        let message = Message::Text(r#"{"setupComplete":{}}"#.into());
        assert_eq!(translate(message), Ok(Incoming::Events(vec![ServerEvent::SetupComplete])));
    }

    #[test]
    fn utf8_binary_is_parsed() {
        let message = Message::Binary(br#"{"serverContent":{"turnComplete":true}}"#.to_vec().into());
        assert_eq!(translate(message), Ok(Incoming::Events(vec![ServerEvent::TurnComplete])));
    }

    #[test]
    fn garbage_binary_is_protocol_error() {
        let message = Message::Binary(vec![0xff, 0xfe].into());
        assert!(matches!(translate(message), Err(SessionError::ProtocolError(_))));
    }

    #[test]
    fn normal_close_ends_stream() {
        assert_eq!(translate(Message::Close(None)), Ok(Incoming::Closed));
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        };
        assert_eq!(translate(Message::Close(Some(frame))), Ok(Incoming::Closed));
    }

    #[test]
    fn abnormal_close_is_connection_error() {
        let frame = CloseFrame {
            code: CloseCode::Policy,
            reason: "quota exceeded".into(),
        };
        let err = translate(Message::Close(Some(frame))).unwrap_err();
        assert_eq!(
            err,
            SessionError::ConnectionError("closed by remote (1008): quota exceeded".into())
        );
    }

    #[test]
    fn control_frames_are_ignored() {
        assert_eq!(translate(Message::Ping(vec![1].into())), Ok(Incoming::Ignored));
        assert_eq!(translate(Message::Pong(vec![1].into())), Ok(Incoming::Ignored));
    }

    #[test]
    fn key_is_added_to_url() {
        let config = SessionConfiguration {
            endpoint_url: "wss://example.test/live".into(),
            api_key: Some("secret".into()),
            ..Default::default()
        };
        let transport = WebSocketTransport::new(&config);
        assert_eq!(transport.url, "wss://example.test/live?key=secret");
        assert!(transport.stream.is_none());
    }

    #[tokio::test]
    async fn close_without_connect_is_noop() {
        let config = SessionConfiguration::default();
        let mut transport = WebSocketTransport::new(&config);
        assert_eq!(transport.close().await, Ok(()));
        assert!(transport.next_event().await.is_none());
    }
}
