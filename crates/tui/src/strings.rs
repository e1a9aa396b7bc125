// Centralized UI strings and labels. ASCII-friendly by default.

use unicode_width::UnicodeWidthStr;

// Role prefixes; colors are applied in the UI.
pub const PREFIX_USER: &str = "| ";
pub const PREFIX_ASSISTANT: &str = "> ";
pub const PREFIX_ERROR: &str = "! ";

pub const APP_TITLE: &str = "Groq Chatbot";
pub const APP_DESCRIPTION: &str = "This is a simple chatbot application using Groq's LLM.";
pub const INPUT_HINT: &str = "Ask a question";

// UI block titles (keep surrounding spaces for visual padding)
pub const TITLE_SETTINGS: &str = " Settings ";
pub const TITLE_CHAT: &str = " Chat ";
pub const TITLE_INPUT: &str = " Question ";
pub const TITLE_HELP: &str = " Help / Shortcuts ";

pub const LABEL_API_KEY: &str = "Groq API Key";
pub const HINT_API_KEY: &str = "Enter your Groq API key here.";
pub const LABEL_MODEL: &str = "Select Model";
pub const HINT_MODEL: &str = "Choose the model you want to use for the chatbot.";
pub const LABEL_CLEAR: &str = "Clear chat (Ctrl+L)";

pub const MISSING_API_KEY: &str = "Please enter your Groq API key to start.";

pub const EXAMPLES_TITLE: &str = "Try these examples:";
pub const EXAMPLE_QUESTIONS: [&str; 4] = [
    "What is LangChain?",
    "Explain Groq's LPU technology",
    "How do I learn programming?",
    "Write a haiku about AI",
];
pub const FOOTER: &str = "Built with Rust & Groq | Experience the speed!";

pub fn client_setup_error(detail: &str) -> String {
    format!("Could not set up the Groq client: {}", detail)
}

// Status bar stick label
pub const STICK_BOTTOM: &str = "Bottom";

pub fn build_stick_label(scroll: u16) -> String {
    if scroll == 0 {
        STICK_BOTTOM.to_string()
    } else {
        format!("+{} lines", scroll)
    }
}

// Width-aware status line; segments that do not fit are dropped from the end.
pub fn build_status_line(
    stick: &str,
    focus: &str,
    model: &str,
    key_set: bool,
    streaming: bool,
    turns: usize,
    max_width: u16,
) -> String {
    let mut segments: Vec<String> = Vec::new();
    segments.push(format!(
        "[Groq][{}][key:{}]",
        model,
        if key_set { "set" } else { "missing" }
    ));
    if streaming {
        segments.push("streaming...".to_string());
    }
    segments.push(format!("[{}][{}] Turns:{}", stick, focus, turns));
    let hints: [&str; 5] = [
        "Enter: send; Shift+Enter: newline",
        "Tab: settings",
        "Ctrl+L: clear chat",
        "PgUp/PgDn: scroll",
        "F1: help",
    ];
    for h in hints {
        segments.push(h.to_string());
    }

    let sep = "  |  ";
    let mut out = String::new();
    let mut used = 0usize;
    for (i, seg) in segments.iter().enumerate() {
        let segw = UnicodeWidthStr::width(seg.as_str());
        let addw = segw + if i == 0 { 0 } else { UnicodeWidthStr::width(sep) };
        if used + addw > max_width as usize {
            break;
        }
        if i > 0 {
            out.push_str(sep);
            used += UnicodeWidthStr::width(sep);
        }
        out.push_str(seg);
        used += segw;
    }
    out
}

pub fn help_lines_ascii() -> &'static [&'static str] {
    &[
        "Basic",
        "  Enter: Send question    Shift+Enter: Newline    Esc/Ctrl-C: Quit",
        "Settings",
        "  Tab: Cycle focus Question -> API key -> Model",
        "  API key: type, then Enter or Tab to apply (input is masked)",
        "  Model: Up/Down or Enter to switch",
        "  Ctrl+L: Clear chat    F2: Show/hide settings",
        "Input Editing",
        "  Arrow: Move cursor    Backspace/Delete: Delete prev/next char",
        "  Home/End, Ctrl+A/E: Line start/end    Ctrl+Arrow: Word move",
        "  Ctrl+W: Delete prev word    Ctrl+U/K: Kill to line start/end",
        "Chat Scrolling",
        "  Mouse wheel: Scroll    PgUp/PgDn: Page    Ctrl+Up/Down: Fine scroll",
        "  Ctrl+Home/End: Top/bottom",
        "Help",
        "  F1: Open/close this panel",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_fits_width() {
        let full = build_status_line("Bottom", "Question", "llama3-8b-8192", true, false, 2, 400);
        assert!(full.starts_with("[Groq][llama3-8b-8192][key:set]"));
        assert!(full.contains("Turns:2"));
        assert!(full.contains("F1: help"));

        let narrow = build_status_line("Bottom", "Question", "llama3-8b-8192", false, true, 0, 40);
        assert_eq!(narrow, "[Groq][llama3-8b-8192][key:missing]");
        assert!(UnicodeWidthStr::width(narrow.as_str()) <= 40);
    }

    #[test]
    fn stick_label() {
        assert_eq!(build_stick_label(0), STICK_BOTTOM);
        assert_eq!(build_stick_label(7), "+7 lines");
    }
}
