/// Running transcripts for the current turn plus the session's history.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    input: String,
    output: String,
    history: ConversationHistory,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment of the student's speech, verbatim.
    pub fn append_input(&mut self, fragment: &str) {
        self.input.push_str(fragment);
    }

    /// Append a fragment of the coach's speech, verbatim.
    pub fn append_output(&mut self, fragment: &str) {
        self.output.push_str(fragment);
    }

    /// Current `(student, coach)` strings for this turn.
    pub fn current(&self) -> (&str, &str) {
        (&self.input, &self.output)
    }

    /// Close the turn: record it in history and start a fresh one.
    ///
    /// Returns the `(student, coach)` strings as they were. An empty side is
    /// not added to history.
    pub fn finalize_turn(&mut self) -> (String, String) {
        let student = std::mem::take(&mut self.input);
        let coach = std::mem::take(&mut self.output);
        if !student.is_empty() {
            self.history.push(Speaker::Student, &student);
        }
        if !coach.is_empty() {
            self.history.push(Speaker::Coach, &coach);
        }
        (student, coach)
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Student,
    Coach,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Self::Student => "You",
            Self::Coach => "Coach",
        }
    }
}

/// Append-only list of `"You: …"` / `"Coach: …"` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    lines: Vec<String>,
}

impl ConversationHistory {
    fn push(&mut self, speaker: Speaker, text: &str) {
        self.lines.push(format!("{}: {}", speaker.label(), text));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
