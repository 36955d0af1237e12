use std::fmt;
use std::time::Duration;

use crate::models::error::SessionError;
use crate::processing::playback_scheduler::PlaybackScheduler;
use crate::session::capture::CapturePipeline;
use crate::traits::audio_output::PlaybackOutput;
use crate::traits::microphone::MicrophoneProvider;
use crate::traits::transport::RealtimeTransport;

/// Upper bound on waiting for the remote to acknowledge a close.
const TRANSPORT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Transport,
    Microphone,
    Playback,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Microphone => "microphone",
            Self::Playback => "playback output",
        };
        f.write_str(name)
    }
}

/// What a teardown actually did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseReport {
    pub released: Vec<Resource>,
    pub failures: Vec<(Resource, SessionError)>,
    /// Scheduled coach buffers that were stopped before they finished.
    pub sources_stopped: usize,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether this call released nothing because everything was already gone.
    pub fn is_noop(&self) -> bool {
        self.released.is_empty() && self.failures.is_empty()
    }

    fn record(&mut self, resource: Resource, result: Result<(), SessionError>) {
        match result {
            Ok(()) => self.released.push(resource),
            Err(e) => {
                log::warn!("failed to release {}: {}", resource, e);
                self.failures.push((resource, e));
            }
        }
    }
}

/// Run a blocking device call on the blocking pool and hand the device back.
///
/// Device backends may wait on their audio thread while opening or
/// closing, which must not stall the session task's runtime.
pub(crate) async fn off_runtime<R, V>(
    mut resource: R,
    call: impl FnOnce(&mut R) -> V + Send + 'static,
) -> Result<(R, V), SessionError>
where
    R: Send + 'static,
    V: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let value = call(&mut resource);
        (resource, value)
    })
    .await
    .map_err(|e| SessionError::DeviceUnavailable(format!("device task failed: {e}")))
}

/// Every resource a live session holds.
///
/// Each slot is taken exactly once by `release_all`, so any number of
/// teardowns, from any state, release each resource at most once.
pub struct SessionResources<M: MicrophoneProvider, O: PlaybackOutput, T: RealtimeTransport> {
    pub(crate) capture: Option<CapturePipeline<M>>,
    pub(crate) output: Option<O>,
    pub(crate) transport: Option<T>,
}

impl<M, O, T> SessionResources<M, O, T>
where
    M: MicrophoneProvider + 'static,
    O: PlaybackOutput + 'static,
    T: RealtimeTransport,
{
    pub(crate) fn new(capture: CapturePipeline<M>, output: O, transport: T) -> Self {
        Self {
            capture: Some(capture),
            output: Some(output),
            transport: Some(transport),
        }
    }

    /// Release everything still held, best-effort.
    ///
    /// Order: remote connection, microphone, in-flight playback, output
    /// device. A failing step is logged and recorded; later steps still run.
    pub async fn release_all(&mut self, scheduler: &mut PlaybackScheduler) -> ReleaseReport {
        let mut report = ReleaseReport::default();

        if let Some(mut transport) = self.transport.take() {
            let result = match tokio::time::timeout(TRANSPORT_CLOSE_TIMEOUT, transport.close()).await {
                Ok(result) => result,
                Err(_) => Err(SessionError::ConnectionError("timed out closing connection".into())),
            };
            report.record(Resource::Transport, result);
        }

        if let Some(capture) = self.capture.take() {
            let result = off_runtime(capture, |c| c.close()).await.and_then(|(_, closed)| closed);
            report.record(Resource::Microphone, result);
        }

        match self.output.take() {
            Some(mut output) => {
                report.sources_stopped = scheduler.interrupt(&mut output);
                let result = off_runtime(output, |o| o.close()).await.and_then(|(_, closed)| closed);
                report.record(Resource::Playback, result);
            }
            None => scheduler.clear(),
        }

        if !report.is_noop() {
            log::debug!(
                "released {:?}, {} failure(s), {} source(s) stopped",
                report.released,
                report.failures.len(),
                report.sources_stopped
            );
        }
        report
    }

    pub fn is_released(&self) -> bool {
        self.capture.is_none() && self.output.is_none() && self.transport.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::models::config::SessionConfiguration;
    use crate::processing::outbound_queue::OutboundQueue;
    use crate::session::shared::SharedState;
    use crate::test_support::{silence, MockMicrophone, MockOutput, MockTransport};

    fn resources(
        mic: &MockMicrophone,
        output: &MockOutput,
        transport: MockTransport,
    ) -> SessionResources<MockMicrophone, MockOutput, MockTransport> {
        let capture = CapturePipeline::new(
            mic.clone(),
            &SessionConfiguration::default(),
            Arc::new(OutboundQueue::new(4)),
            Arc::new(Mutex::new(SharedState::default())),
        );
        SessionResources::new(capture, output.clone(), transport)
    }

    #[tokio::test]
    async fn releases_each_resource_once() {
        let mic = MockMicrophone::new();
        let mut output = MockOutput::new();
        let (transport, remote) = MockTransport::new();
        let mut res = resources(&mic, &output, transport);
        res.capture.as_mut().unwrap().open().unwrap();

        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(&mut output, silence(1.0)).unwrap();

        let report = res.release_all(&mut scheduler).await;
        assert!(report.is_clean());
        assert_eq!(
            report.released,
            vec![Resource::Transport, Resource::Microphone, Resource::Playback]
        );
        assert_eq!(report.sources_stopped, 1);
        assert!(res.is_released());

        let again = res.release_all(&mut scheduler).await;
        assert!(again.is_noop());
        assert_eq!(remote.closes(), 1);
        assert_eq!(mic.stops(), 1);
        assert_eq!(output.closes(), 1);
        assert!(scheduler.is_idle());
    }

    #[tokio::test]
    async fn failure_does_not_skip_later_steps() {
        let mic = MockMicrophone::new();
        let output = MockOutput::new();
        let (transport, remote) = MockTransport::new();
        remote.fail_close(SessionError::ConnectionError("socket gone".into()));
        let mut res = resources(&mic, &output, transport);
        res.capture.as_mut().unwrap().open().unwrap();

        let report = res.release_all(&mut PlaybackScheduler::new()).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, Resource::Transport);
        assert_eq!(mic.stops(), 1);
        assert_eq!(output.closes(), 1);
    }
}
