use crate::models::state::SessionState;

/// Event delegate for live session notifications.
///
/// All methods are called from the session task, never concurrently for the
/// same session. Implementations should marshal to the UI thread if needed.
pub trait SessionDelegate: Send + Sync + 'static {
    /// Called after every transcript fragment with both running strings.
    fn on_transcription_update(&self, input: &str, output: &str);

    /// Called once per completed turn with the student's final text.
    fn on_turn_complete(&self, final_student_text: &str);

    /// Called when the first coach audio of a burst is scheduled.
    fn on_ai_start_speaking(&self);

    /// Called when coach playback goes idle or is interrupted.
    fn on_ai_stop_speaking(&self);

    /// Called at most once, with a message suitable for the student.
    fn on_error(&self, message: &str);

    /// Called exactly once, after every resource has been released.
    fn on_close(&self);

    fn on_state_changed(&self, _state: SessionState) {}
}
