use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::models::audio_models::SessionDiagnostics;
use crate::models::config::SessionConfiguration;
use crate::models::error::SessionError;
use crate::models::state::SessionState;
use crate::processing::outbound_queue::OutboundQueue;
use crate::processing::pcm_codec;
use crate::processing::playback_scheduler::PlaybackScheduler;
use crate::processing::transcript::TranscriptAccumulator;
use crate::protocol::{ServerEvent, SetupMessage};
use crate::session::capture::CapturePipeline;
use crate::session::lifecycle::{off_runtime, SessionResources};
use crate::session::shared::SharedState;
use crate::traits::audio_output::PlaybackOutput;
use crate::traits::microphone::MicrophoneProvider;
use crate::traits::session_delegate::SessionDelegate;
use crate::traits::transport::RealtimeTransport;

/// A live speaking session between a student and the remote coach.
///
/// Generic over the microphone, output, transport and delegate. The session
/// runs as a single Tokio task; every remote event, chunk send, playback
/// decision and delegate call happens on that task. Callers interact with it
/// through the returned [`SessionHandle`].
///
/// ```text
/// [MicrophoneProvider] → CapturePipeline → OutboundQueue ─→ pcm_codec → [RealtimeTransport]
///                                                                             │
/// [PlaybackOutput] ← PlaybackScheduler ← pcm_codec ← ServerEvent::Audio ←─────┤
///                                  TranscriptAccumulator ← transcripts ←──────┘
/// ```
pub struct LiveSession<M, O, T, D>
where
    M: MicrophoneProvider,
    O: PlaybackOutput,
    T: RealtimeTransport,
    D: SessionDelegate,
{
    config: SessionConfiguration,
    resources: SessionResources<M, O, T>,
    scheduler: PlaybackScheduler,
    transcript: TranscriptAccumulator,
    queue: Arc<OutboundQueue>,
    shared: Arc<Mutex<SharedState>>,
    delegate: Arc<D>,
    state_tx: watch::Sender<SessionState>,
    close_rx: watch::Receiver<bool>,
    coach_speaking: bool,
}

enum Wake {
    Close,
    Remote(Option<Result<ServerEvent, SessionError>>),
    Outbound,
    Tick,
}

impl<M, O, T, D> LiveSession<M, O, T, D>
where
    M: MicrophoneProvider + 'static,
    O: PlaybackOutput + 'static,
    T: RealtimeTransport + 'static,
    D: SessionDelegate,
{
    /// Start a session and wait until the remote has accepted it.
    ///
    /// Opens the microphone, then the output, then connects. On failure all
    /// partially acquired resources are released, `on_error` and `on_close`
    /// have fired once each, and the error is returned.
    pub async fn start(
        config: SessionConfiguration,
        microphone: M,
        output: O,
        transport: T,
        delegate: Arc<D>,
    ) -> Result<SessionHandle, SessionError> {
        let handle = Self::launch(config, microphone, output, transport, delegate)?;
        match handle.wait_open().await {
            Ok(()) => Ok(handle),
            Err(e) => {
                handle.close().await;
                Err(e)
            }
        }
    }

    /// Start a session without waiting for it to open.
    ///
    /// Must be called within a Tokio runtime. Setup continues on the session
    /// task and can be cancelled with [`SessionHandle::close`].
    pub fn launch(
        config: SessionConfiguration,
        microphone: M,
        output: O,
        transport: T,
        delegate: Arc<D>,
    ) -> Result<SessionHandle, SessionError> {
        let rejected = config
            .validate()
            .map_err(SessionError::ConfigurationFailed)
            .and_then(|()| {
                tokio::runtime::Handle::try_current()
                    .map_err(|e| SessionError::ConfigurationFailed(format!("no async runtime: {e}")))
            });
        let runtime = match rejected {
            Ok(runtime) => runtime,
            Err(e) => {
                log::error!("session not started: {}", e);
                delegate.on_error(&e.user_message());
                delegate.on_close();
                return Err(e);
            }
        };

        let queue = Arc::new(OutboundQueue::new(config.outbound_queue_capacity));
        let shared = Arc::new(Mutex::new(SharedState::default()));
        let capture = CapturePipeline::new(microphone, &config, Arc::clone(&queue), Arc::clone(&shared));
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);
        let (close_tx, close_rx) = watch::channel(false);

        let handle = SessionHandle {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            state_rx,
            close_tx: Arc::new(close_tx),
            shared: Arc::clone(&shared),
        };
        log::info!("session {} starting", handle.id);

        let session = Self {
            config,
            resources: SessionResources::new(capture, output, transport),
            scheduler: PlaybackScheduler::new(),
            transcript: TranscriptAccumulator::new(),
            queue,
            shared,
            delegate,
            state_tx,
            close_rx,
            coach_speaking: false,
        };
        delegate_state(&session.delegate, SessionState::Connecting);
        runtime.spawn(session.run());

        Ok(handle)
    }

    async fn run(mut self) {
        if let Err(err) = self.drive().await {
            log::error!("session failed: {}", err);
            self.shared.lock().last_error = Some(err.clone());
            self.delegate.on_error(&err.user_message());
        }
        self.shutdown().await;
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        if let Some(capture) = self.resources.capture.take() {
            let (capture, opened) = off_runtime(capture, |c| c.open()).await?;
            self.resources.capture = Some(capture);
            opened?;
        }
        if let Some(output) = self.resources.output.take() {
            let (rate, channels) = (self.config.playback_sample_rate, self.config.playback_channels);
            let (output, opened) = off_runtime(output, move |o| o.open(rate, channels)).await?;
            self.resources.output = Some(output);
            opened?;
        }

        let setup = SetupMessage::from_config(&self.config);
        let Some(transport) = self.resources.transport.as_mut() else {
            return Ok(());
        };
        let connected = tokio::select! {
            biased;
            _ = close_requested(&mut self.close_rx) => false,
            result = transport.connect(&setup) => {
                result?;
                true
            }
        };
        if !connected {
            log::info!("session closed while connecting");
            return Ok(());
        }

        log::info!("connected, flushing {} queued chunk(s)", self.queue.len());
        self.shared.lock().opened = true;
        self.set_state(SessionState::Open);
        self.flush_outbound().await?;
        self.event_loop().await
    }

    async fn event_loop(&mut self) -> Result<(), SessionError> {
        let mut tick = tokio::time::interval(Duration::from_millis(self.config.playback_poll_interval_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let queue = Arc::clone(&self.queue);

        loop {
            let Some(transport) = self.resources.transport.as_mut() else {
                return Ok(());
            };
            // Remote events are polled after outbound audio and the playback tick.
            let wake = tokio::select! {
                biased;
                _ = close_requested(&mut self.close_rx) => Wake::Close,
                _ = queue.notified() => Wake::Outbound,
                _ = tick.tick() => Wake::Tick,
                event = transport.next_event() => Wake::Remote(event),
            };

            match wake {
                Wake::Close => {
                    log::info!("close requested");
                    return Ok(());
                }
                Wake::Remote(None) => {
                    log::info!("remote closed the session");
                    return Ok(());
                }
                Wake::Remote(Some(Err(e))) => return Err(e),
                Wake::Remote(Some(Ok(event))) => self.handle_event(event)?,
                Wake::Outbound => self.flush_outbound().await?,
                Wake::Tick => {
                    self.reap_playback();
                    if !self.queue.is_empty() {
                        self.flush_outbound().await?;
                    }
                }
            }
        }
    }

    /// Send every queued chunk, oldest first.
    async fn flush_outbound(&mut self) -> Result<(), SessionError> {
        let Some(transport) = self.resources.transport.as_mut() else {
            return Ok(());
        };
        while let Some(chunk) = self.queue.pop() {
            let blob = pcm_codec::encode_chunk_at(&chunk.samples, self.config.capture_sample_rate);
            transport.send_audio(&blob).await?;
            self.shared.lock().diagnostics.chunks_sent += 1;
        }
        Ok(())
    }

    fn handle_event(&mut self, event: ServerEvent) -> Result<(), SessionError> {
        match event {
            ServerEvent::SetupComplete => log::debug!("ignoring repeated setup confirmation"),
            ServerEvent::InputTranscript(text) => {
                self.transcript.append_input(&text);
                self.notify_transcripts();
                self.set_state(SessionState::Listening);
            }
            ServerEvent::OutputTranscript(text) => {
                self.transcript.append_output(&text);
                self.notify_transcripts();
                if !self.coach_speaking {
                    self.set_state(SessionState::Thinking);
                }
            }
            ServerEvent::Audio { mime_type, data } => self.play_audio(&mime_type, &data)?,
            ServerEvent::Interrupted => self.interrupt_playback(),
            ServerEvent::TurnComplete => self.complete_turn(),
            ServerEvent::GoAway { time_left } => {
                log::warn!(
                    "remote will disconnect soon (time left: {})",
                    time_left.as_deref().unwrap_or("unknown")
                );
            }
            ServerEvent::Error(message) => return Err(SessionError::ConnectionError(message)),
        }
        Ok(())
    }

    fn play_audio(&mut self, mime_type: &str, data: &str) -> Result<(), SessionError> {
        let bytes = pcm_codec::decode_transport(data)?;
        let sample_rate = pcm_codec::pcm_rate_from_mime(mime_type).unwrap_or(self.config.playback_sample_rate);
        let buffer = pcm_codec::decode_blob(&bytes, sample_rate, self.config.playback_channels)?;
        self.shared.lock().diagnostics.audio_fragments_received += 1;

        if buffer.frames == 0 {
            return Ok(());
        }
        let Some(output) = self.resources.output.as_mut() else {
            return Ok(());
        };
        let source = self.scheduler.enqueue(output, buffer)?;
        self.shared.lock().diagnostics.buffers_scheduled += 1;
        log::debug!(
            "scheduled coach audio #{} at {:.3}s for {:.3}s",
            source.id,
            source.start_time,
            source.duration
        );

        if !self.coach_speaking {
            self.coach_speaking = true;
            self.delegate.on_ai_start_speaking();
        }
        self.set_state(SessionState::CoachSpeaking);
        Ok(())
    }

    fn interrupt_playback(&mut self) {
        let stopped = match self.resources.output.as_mut() {
            Some(output) => self.scheduler.interrupt(output),
            None => {
                self.scheduler.clear();
                0
            }
        };
        self.shared.lock().diagnostics.interruptions += 1;
        log::info!("coach interrupted, {} buffer(s) flushed", stopped);

        self.coach_speaking = false;
        self.delegate.on_ai_stop_speaking();
        self.set_state(SessionState::Listening);
    }

    fn complete_turn(&mut self) {
        let (student, _coach) = self.transcript.finalize_turn();
        {
            let mut s = self.shared.lock();
            s.history = self.transcript.history().clone();
            s.diagnostics.turns_completed += 1;
        }
        log::info!("turn complete ({} chars from student)", student.chars().count());

        self.delegate.on_turn_complete(&student);
        if !self.coach_speaking {
            self.set_state(SessionState::Open);
        }
    }

    /// Drop finished playback; when the coach has gone quiet, say so.
    fn reap_playback(&mut self) {
        let Some(output) = self.resources.output.as_ref() else {
            return;
        };
        let now = output.current_time();
        if self.scheduler.reap_finished(now) && self.coach_speaking {
            self.coach_speaking = false;
            self.delegate.on_ai_stop_speaking();
            self.set_state(SessionState::Open);
        }
    }

    fn notify_transcripts(&self) {
        let (input, output) = self.transcript.current();
        self.delegate.on_transcription_update(input, output);
    }

    fn set_state(&self, state: SessionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            log::debug!("session state → {}", state.as_str());
            delegate_state(&self.delegate, state);
        }
    }

    async fn shutdown(&mut self) {
        self.set_state(SessionState::Closing);

        let report = self.resources.release_all(&mut self.scheduler).await;
        if !report.is_clean() {
            log::warn!("teardown finished with {} failure(s)", report.failures.len());
        }
        self.queue.clear();
        self.coach_speaking = false;

        self.shared.lock().diagnostics.chunks_dropped = self.queue.dropped_count();
        delegate_state(&self.delegate, SessionState::Closed);
        self.delegate.on_close();
        self.state_tx.send_replace(SessionState::Closed);
        log::info!("session closed");
    }
}

fn delegate_state<D: SessionDelegate>(delegate: &Arc<D>, state: SessionState) {
    delegate.on_state_changed(state);
}

/// Resolves once a close has been requested, or every handle is gone.
async fn close_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        let requested = *rx.borrow_and_update();
        if requested {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Caller-side view of a running session.
///
/// Cheap to clone. Dropping every clone closes the session.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    started_at: DateTime<Utc>,
    state_rx: watch::Receiver<SessionState>,
    close_tx: Arc<watch::Sender<bool>>,
    shared: Arc<Mutex<SharedState>>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Completed turns so far, as `"You: …"` / `"Coach: …"` lines.
    pub fn history(&self) -> Vec<String> {
        self.shared.lock().history.lines().to_vec()
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.shared.lock().diagnostics.clone()
    }

    /// The error that ended the session, if any.
    pub fn last_error(&self) -> Option<SessionError> {
        self.shared.lock().last_error.clone()
    }

    /// Ask the session to close without waiting for it.
    pub fn request_close(&self) {
        self.close_tx.send_replace(true);
    }

    /// Close the session and wait until every resource is released.
    ///
    /// Idempotent: later calls just wait for (or observe) `Closed`.
    pub async fn close(&self) {
        self.request_close();
        self.wait_closed().await;
    }

    /// Wait until the remote has accepted the session.
    ///
    /// Succeeds if the session was ever accepted, even when it has closed
    /// since. Otherwise fails with the error that ended it.
    pub async fn wait_open(&self) -> Result<(), SessionError> {
        let mut rx = self.state_rx.clone();
        let reached = rx
            .wait_for(|state| state.is_live() || state.is_terminal())
            .await
            .map(|state| *state);
        match reached {
            Ok(state) if state.is_live() => Ok(()),
            _ if self.shared.lock().opened => Ok(()),
            _ => Err(self.last_error().unwrap_or_else(|| {
                SessionError::ConnectionError("session closed before it opened".into())
            })),
        }
    }

    pub async fn wait_closed(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|state| state.is_terminal()).await;
    }
}
