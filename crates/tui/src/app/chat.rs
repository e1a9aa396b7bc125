use qa_core::llm::Role;
use textwrap::{wrap, Options};
use unicode_width::UnicodeWidthStr;

use crate::strings::{PREFIX_ASSISTANT, PREFIX_ERROR, PREFIX_USER};

use super::App;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    Pending,
    Error,
}

impl EntryKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntryKind::User => PREFIX_USER,
            EntryKind::Assistant | EntryKind::Pending => PREFIX_ASSISTANT,
            EntryKind::Error => PREFIX_ERROR,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WrappedEntry {
    pub kind: EntryKind,
    pub lines: Vec<String>,
}

impl App {
    /// Committed messages, then the streaming answer or the last error.
    pub fn transcript(&self) -> Vec<(EntryKind, String)> {
        let mut out: Vec<(EntryKind, String)> = self
            .session
            .messages()
            .iter()
            .map(|m| {
                let kind = match m.role {
                    Role::User => EntryKind::User,
                    Role::Assistant | Role::System => EntryKind::Assistant,
                };
                (kind, m.content.clone())
            })
            .collect();
        if self.is_streaming() && !self.turn_view.is_empty() {
            out.push((EntryKind::Pending, self.turn_view.clone()));
        }
        if let Some(e) = &self.turn_error {
            out.push((EntryKind::Error, e.clone()));
        }
        out
    }

    pub fn wrapped_transcript(&self, width: u16) -> Vec<WrappedEntry> {
        self.transcript()
            .into_iter()
            .map(|(kind, text)| wrap_entry(kind, &text, width))
            .collect()
    }
}

fn wrap_entry(kind: EntryKind, text: &str, width: u16) -> WrappedEntry {
    let prefix = kind.prefix();
    let full = format!("{}{}", prefix, text);
    let indent = " ".repeat(UnicodeWidthStr::width(prefix));
    let opts = Options::new(width.max(1) as usize).subsequent_indent(&indent);
    let lines = wrap(&full, opts)
        .into_iter()
        .map(|c| c.into_owned())
        .collect::<Vec<_>>();
    WrappedEntry { kind, lines }
}

/// First visible line and the clamped scroll for a bottom-anchored view.
/// `scroll` counts lines up from the bottom.
pub fn chat_window(total: usize, viewport: usize, scroll: u16) -> (usize, u16) {
    let max_scroll = total.saturating_sub(viewport);
    let scroll = (scroll as usize).min(max_scroll);
    (max_scroll - scroll, scroll as u16)
}
