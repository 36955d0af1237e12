use std::collections::BTreeMap;

use crate::models::audio_models::{PlaybackBuffer, ScheduledSource};
use crate::models::error::SessionError;
use crate::traits::audio_output::PlaybackOutput;

/// Gapless, ordered scheduling of coach audio against the output clock.
///
/// Each buffer starts exactly where the previous one ends, unless the
/// output clock has already passed that point (after an underrun), in which
/// case it starts now.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start_time: f64,
    in_flight: BTreeMap<u64, ScheduledSource>,
    next_id: u64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `buffer` right after everything already scheduled.
    pub fn enqueue<O>(&mut self, output: &mut O, buffer: PlaybackBuffer) -> Result<ScheduledSource, SessionError>
    where
        O: PlaybackOutput + ?Sized,
    {
        let start_time = self.next_start_time.max(output.current_time());
        let source = ScheduledSource {
            id: self.next_id,
            start_time,
            duration: buffer.duration_secs(),
        };
        output.schedule(source.id, buffer, start_time)?;

        self.next_id += 1;
        self.next_start_time = source.end_time();
        self.in_flight.insert(source.id, source);
        Ok(source)
    }

    /// Drop every source that has finished by `now`.
    ///
    /// Returns `true` only when this call emptied a non-empty set, i.e. the
    /// coach just went quiet.
    pub fn reap_finished(&mut self, now: f64) -> bool {
        if self.in_flight.is_empty() {
            return false;
        }
        self.in_flight.retain(|_, source| source.end_time() > now);
        self.in_flight.is_empty()
    }

    /// Stop everything in flight and rewind the cursor.
    ///
    /// Returns how many sources were stopped. Stopped audio is discarded.
    pub fn interrupt<O>(&mut self, output: &mut O) -> usize
    where
        O: PlaybackOutput + ?Sized,
    {
        let stopped = self.in_flight.len();
        for id in self.in_flight.keys() {
            output.stop(*id);
        }
        self.in_flight.clear();
        self.next_start_time = 0.0;
        stopped
    }

    /// Forget in-flight sources without touching an output, for when the
    /// output is already gone.
    pub fn clear(&mut self) {
        self.in_flight.clear();
        self.next_start_time = 0.0;
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }
}
