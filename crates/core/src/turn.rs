use tracing::debug;

use crate::llm::{ChatError, Role};
use crate::session::Session;

/// Appended to partial text while the answer is still streaming.
pub const IN_PROGRESS_MARKER: &str = "...";

/// One question/answer exchange in flight.
///
/// Beginning a turn records the question; the answer is committed only when
/// the stream ends cleanly. A failed turn leaves nothing behind but the
/// question.
#[derive(Debug)]
pub struct Turn {
    answer: String,
}

impl Turn {
    pub fn begin<S: Into<String>>(session: &mut Session, question: S) -> Self {
        session.push(Role::User, question.into());
        Self {
            answer: String::new(),
        }
    }

    /// Adds a fragment and returns the text to repaint.
    pub fn push(&mut self, fragment: &str) -> String {
        self.answer.push_str(fragment);
        self.in_progress()
    }

    pub fn in_progress(&self) -> String {
        format!("{}{}", self.answer, IN_PROGRESS_MARKER)
    }

    pub fn finish(self, session: &mut Session) -> String {
        debug!(target: "core::turn", "turn finished: {} chars", self.answer.len());
        session.push(Role::Assistant, self.answer.clone());
        self.answer
    }

    /// Drops the partial answer and returns the message shown in its place.
    pub fn fail(self, err: &ChatError) -> String {
        debug!(target: "core::turn", "turn failed after {} chars: {}", self.answer.len(), err);
        error_text(err)
    }
}

pub fn error_text(err: &ChatError) -> String {
    format!("Error: {}", err)
}
