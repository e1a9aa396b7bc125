use unicode_segmentation::UnicodeSegmentation;

/// Editable text with a grapheme-indexed cursor.
#[derive(Clone, Debug, Default)]
pub struct LineEditor {
    pub text: String,
    pub cursor: usize,
}

impl LineEditor {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.text.graphemes(true).count()
    }

    /// One bullet per grapheme.
    pub fn masked(&self) -> String {
        "•".repeat(self.len())
    }

    pub fn insert_text(&mut self, s: &str) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        let mut new_text = String::with_capacity(self.text.len() + s.len());
        for g in &parts[..idx] {
            new_text.push_str(g);
        }
        new_text.push_str(s);
        for g in &parts[idx..] {
            new_text.push_str(g);
        }
        self.text = new_text;
        let added = s.graphemes(true).count();
        self.cursor = (idx + added).min(self.len());
    }

    pub fn delete_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        parts.remove(idx - 1);
        self.text = parts.concat();
        self.cursor = idx - 1;
    }

    pub fn delete_right(&mut self) {
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        if idx < parts.len() {
            parts.remove(idx);
            self.text = parts.concat();
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    pub fn move_line_start(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let mut i = self.cursor.min(parts.len());
        while i > 0 && parts[i - 1] != "\n" {
            i -= 1;
        }
        self.cursor = i;
    }

    pub fn move_line_end(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let mut i = self.cursor.min(parts.len());
        while i < parts.len() && parts[i] != "\n" {
            i += 1;
        }
        self.cursor = i;
    }

    pub fn delete_prev_word(&mut self) {
        let end = self.cursor.min(self.len());
        let start = {
            let parts: Vec<&str> = self.text.graphemes(true).collect();
            word_start(&parts, end)
        };
        self.remove_range(start, end);
        self.cursor = start;
    }

    pub fn kill_to_line_start(&mut self) {
        let end = self.cursor;
        self.move_line_start();
        let start = self.cursor;
        self.remove_range(start, end);
    }

    pub fn kill_to_line_end(&mut self) {
        let start = self.cursor;
        self.move_line_end();
        let end = self.cursor;
        self.remove_range(start, end);
        self.cursor = start;
    }

    pub fn move_word_left(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        self.cursor = word_start(&parts, self.cursor.min(parts.len()));
    }

    pub fn move_word_right(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let mut i = self.cursor.min(parts.len());
        while i < parts.len() && parts[i].trim().is_empty() {
            i += 1;
        }
        while i < parts.len() && !parts[i].trim().is_empty() {
            i += 1;
        }
        self.cursor = i;
    }

    fn remove_range(&mut self, start: usize, end: usize) {
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        if start < end && end <= parts.len() {
            parts.drain(start..end);
            self.text = parts.concat();
        }
    }
}

fn word_start(parts: &[&str], from: usize) -> usize {
    let mut i = from;
    while i > 0 && parts[i - 1].trim().is_empty() {
        i -= 1;
    }
    while i > 0 && !parts[i - 1].trim().is_empty() {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(s: &str) -> LineEditor {
        let mut e = LineEditor::default();
        e.insert_text(s);
        e
    }

    #[test]
    fn insert_in_middle() {
        let mut e = editor("helo");
        e.cursor = 3;
        e.insert_text("l");
        assert_eq!(e.text, "hello");
        assert_eq!(e.cursor, 4);
    }

    #[test]
    fn deletes_graphemes_not_bytes() {
        let mut e = editor("añ👍🏽");
        e.delete_left();
        assert_eq!(e.text, "añ");
        e.move_left();
        e.delete_right();
        assert_eq!(e.text, "a");
    }

    #[test]
    fn word_editing() {
        let mut e = editor("what is  groq");
        e.delete_prev_word();
        assert_eq!(e.text, "what is  ");
        e.move_word_left();
        assert_eq!(e.cursor, 5);
        e.move_word_right();
        assert_eq!(e.cursor, 7);
    }

    #[test]
    fn kill_line_halves() {
        let mut e = editor("first\nsecond line");
        e.cursor = 12;
        e.kill_to_line_end();
        assert_eq!(e.text, "first\nsecond");
        e.kill_to_line_start();
        assert_eq!(e.text, "first\n");
        assert_eq!(e.cursor, 6);
    }

    #[test]
    fn mask_hides_every_grapheme() {
        let e = editor("gsk_ab");
        assert_eq!(e.masked(), "••••••");
        assert_eq!(LineEditor::default().masked(), "");
    }
}
