//! In-crate doubles for microphone, output, transport and delegate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::models::audio_models::{AudioDevice, DeviceDirection, PlaybackBuffer, WireAudioBlob};
use crate::models::error::SessionError;
use crate::models::state::SessionState;
use crate::processing::pcm_codec;
use crate::protocol::{ServerEvent, SetupMessage};
use crate::traits::audio_output::PlaybackOutput;
use crate::traits::microphone::{AudioBufferCallback, MicrophoneProvider};
use crate::traits::session_delegate::SessionDelegate;
use crate::traits::transport::RealtimeTransport;

/// Mono 24 kHz silence of the given length.
pub fn silence(duration_secs: f64) -> PlaybackBuffer {
    let frames = (duration_secs * 24_000.0).round() as usize;
    PlaybackBuffer {
        sample_rate: 24_000,
        channels: vec![vec![0.0; frames]],
        frames,
    }
}

/// A coach audio event carrying `duration_secs` of 24 kHz mono PCM.
pub fn coach_audio(duration_secs: f64) -> ServerEvent {
    let frames = (duration_secs * 24_000.0).round() as usize;
    let pcm = pcm_codec::float_to_pcm16(&vec![0.1; frames]);
    ServerEvent::Audio {
        mime_type: "audio/pcm;rate=24000".into(),
        data: STANDARD.encode(pcm),
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

// --- Microphone ---

#[derive(Default)]
struct MicInner {
    callback: Option<AudioBufferCallback>,
    start_error: Option<SessionError>,
    start_delay: Option<Duration>,
    starts: usize,
    stops: usize,
}

/// Microphone whose audio is pushed by the test through `emit`.
#[derive(Clone, Default)]
pub struct MockMicrophone {
    inner: Arc<Mutex<MicInner>>,
}

impl MockMicrophone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denied() -> Self {
        let mic = Self::default();
        mic.inner.lock().start_error = Some(SessionError::PermissionDenied);
        mic
    }

    /// A microphone whose `start` blocks the calling thread for `delay`.
    pub fn slow(delay: Duration) -> Self {
        let mic = Self::default();
        mic.inner.lock().start_delay = Some(delay);
        mic
    }

    pub fn emit(&self, samples: &[f32], sample_rate: f64, channels: u16) {
        if let Some(callback) = self.callback() {
            callback(samples, sample_rate, channels);
        }
    }

    pub fn callback(&self) -> Option<AudioBufferCallback> {
        self.inner.lock().callback.clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.inner.lock().callback.is_some()
    }

    pub fn starts(&self) -> usize {
        self.inner.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.inner.lock().stops
    }
}

impl MicrophoneProvider for MockMicrophone {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError> {
        let delay = self.inner.lock().start_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let mut inner = self.inner.lock();
        inner.starts += 1;
        if let Some(err) = inner.start_error.clone() {
            return Err(err);
        }
        inner.callback = Some(callback);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.stops += 1;
        inner.callback = None;
        Ok(())
    }

    fn device_info(&self) -> Option<AudioDevice> {
        Some(AudioDevice {
            id: "mock-mic".into(),
            name: "Mock Microphone".into(),
            direction: DeviceDirection::Input,
            is_default: true,
        })
    }
}

// --- Output ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledCall {
    pub id: u64,
    pub start_at: f64,
    pub frames: usize,
}

#[derive(Default)]
struct OutputInner {
    now: f64,
    opened: Option<(u32, u16)>,
    scheduled: Vec<ScheduledCall>,
    stopped: Vec<u64>,
    closes: usize,
    fail_schedule: bool,
}

/// Output with a clock the test advances by hand.
#[derive(Clone, Default)]
pub struct MockOutput {
    inner: Arc<Mutex<OutputInner>>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f64) {
        self.inner.lock().now += secs;
    }

    pub fn set_fail_schedule(&self, fail: bool) {
        self.inner.lock().fail_schedule = fail;
    }

    pub fn opened(&self) -> Option<(u32, u16)> {
        self.inner.lock().opened
    }

    pub fn scheduled(&self) -> Vec<ScheduledCall> {
        self.inner.lock().scheduled.clone()
    }

    pub fn scheduled_ids(&self) -> Vec<u64> {
        self.inner.lock().scheduled.iter().map(|c| c.id).collect()
    }

    pub fn stopped_ids(&self) -> Vec<u64> {
        self.inner.lock().stopped.clone()
    }

    pub fn closes(&self) -> usize {
        self.inner.lock().closes
    }
}

impl PlaybackOutput for MockOutput {
    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<(), SessionError> {
        self.inner.lock().opened = Some((sample_rate, channels));
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().now
    }

    fn schedule(&mut self, id: u64, buffer: PlaybackBuffer, start_at: f64) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if inner.fail_schedule {
            return Err(SessionError::DeviceUnavailable("output gone".into()));
        }
        inner.scheduled.push(ScheduledCall {
            id,
            start_at,
            frames: buffer.frames,
        });
        Ok(())
    }

    fn stop(&mut self, id: u64) {
        self.inner.lock().stopped.push(id);
    }

    fn close(&mut self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.closes += 1;
        inner.opened = None;
        Ok(())
    }
}

// --- Transport ---

type Incoming = Option<Result<ServerEvent, SessionError>>;

#[derive(Default)]
struct TransportLog {
    connect_attempts: usize,
    connected: bool,
    setup: Option<SetupMessage>,
    sent: Vec<WireAudioBlob>,
    /// Remote events handed to the session so far.
    delivered: usize,
    /// `delivered` at the moment of each send.
    delivered_at_send: Vec<usize>,
    closes: usize,
    close_error: Option<SessionError>,
}

/// Transport whose remote side is driven by a [`MockRemote`].
pub struct MockTransport {
    gate: watch::Receiver<Option<Result<(), SessionError>>>,
    events: mpsc::UnboundedReceiver<Incoming>,
    log: Arc<Mutex<TransportLog>>,
}

/// Test-side controls for a [`MockTransport`].
pub struct MockRemote {
    gate: watch::Sender<Option<Result<(), SessionError>>>,
    events: mpsc::UnboundedSender<Incoming>,
    log: Arc<Mutex<TransportLog>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockRemote) {
        let (gate_tx, gate_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let log = Arc::new(Mutex::new(TransportLog::default()));
        (
            Self {
                gate: gate_rx,
                events: events_rx,
                log: Arc::clone(&log),
            },
            MockRemote {
                gate: gate_tx,
                events: events_tx,
                log,
            },
        )
    }
}

impl MockRemote {
    /// Let a pending or future `connect` succeed.
    pub fn accept(&self) {
        self.gate.send_replace(Some(Ok(())));
    }

    pub fn reject(&self, err: SessionError) {
        self.gate.send_replace(Some(Err(err)));
    }

    pub fn send(&self, event: ServerEvent) {
        let _ = self.events.send(Some(Ok(event)));
    }

    pub fn fail(&self, err: SessionError) {
        let _ = self.events.send(Some(Err(err)));
    }

    /// Close from the remote side, normally.
    pub fn hang_up(&self) {
        let _ = self.events.send(None);
    }

    pub fn fail_close(&self, err: SessionError) {
        self.log.lock().close_error = Some(err);
    }

    pub fn connect_attempts(&self) -> usize {
        self.log.lock().connect_attempts
    }

    pub fn is_connected(&self) -> bool {
        self.log.lock().connected
    }

    pub fn setup(&self) -> Option<SetupMessage> {
        self.log.lock().setup.clone()
    }

    pub fn sent(&self) -> Vec<WireAudioBlob> {
        self.log.lock().sent.clone()
    }

    pub fn closes(&self) -> usize {
        self.log.lock().closes
    }

    /// For each sent chunk, how many remote events the session had taken by then.
    pub fn delivered_at_send(&self) -> Vec<usize> {
        self.log.lock().delivered_at_send.clone()
    }
}

#[async_trait]
impl RealtimeTransport for MockTransport {
    async fn connect(&mut self, setup: &SetupMessage) -> Result<(), SessionError> {
        {
            let mut log = self.log.lock();
            log.connect_attempts += 1;
            log.setup = Some(setup.clone());
        }
        let outcome = match self.gate.wait_for(|g| g.is_some()).await {
            Ok(gate) => gate.clone().unwrap_or(Ok(())),
            Err(_) => Err(SessionError::ConnectionError("remote went away".into())),
        };
        if outcome.is_ok() {
            self.log.lock().connected = true;
        }
        outcome
    }

    async fn send_audio(&mut self, blob: &WireAudioBlob) -> Result<(), SessionError> {
        let mut log = self.log.lock();
        log.sent.push(blob.clone());
        let delivered = log.delivered;
        log.delivered_at_send.push(delivered);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<ServerEvent, SessionError>> {
        let event = self.events.recv().await.flatten();
        if event.is_some() {
            self.log.lock().delivered += 1;
        }
        event
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let mut log = self.log.lock();
        log.closes += 1;
        log.connected = false;
        match log.close_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// --- Delegate ---

#[derive(Debug, Clone, PartialEq)]
pub enum DelegateEvent {
    Transcription(String, String),
    TurnComplete(String),
    StartSpeaking,
    StopSpeaking,
    Error(String),
    Close,
    State(SessionState),
}

/// Delegate that records every call in order.
#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&DelegateEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn turns(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DelegateEvent::TurnComplete(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DelegateEvent::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.count(|e| matches!(e, DelegateEvent::Close))
    }

    fn push(&self, event: DelegateEvent) {
        self.events.lock().push(event);
    }
}

impl SessionDelegate for RecordingDelegate {
    fn on_transcription_update(&self, input: &str, output: &str) {
        self.push(DelegateEvent::Transcription(input.into(), output.into()));
    }

    fn on_turn_complete(&self, final_student_text: &str) {
        self.push(DelegateEvent::TurnComplete(final_student_text.into()));
    }

    fn on_ai_start_speaking(&self) {
        self.push(DelegateEvent::StartSpeaking);
    }

    fn on_ai_stop_speaking(&self) {
        self.push(DelegateEvent::StopSpeaking);
    }

    fn on_error(&self, message: &str) {
        self.push(DelegateEvent::Error(message.into()));
    }

    fn on_close(&self) {
        self.push(DelegateEvent::Close);
    }

    fn on_state_changed(&self, state: SessionState) {
        self.push(DelegateEvent::State(state));
    }
}
