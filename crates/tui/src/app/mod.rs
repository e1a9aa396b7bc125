use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use providers::groq::{GroqClient, GroqConfig};
use qa_core::llm::{ChatError, ModelClient};
use qa_core::model::Model;
use qa_core::pipeline::{Pipeline, PipelineCache};
use qa_core::session::Session;
use qa_core::turn::Turn;
use ratatui::layout::Rect;
use std::sync::{mpsc, Arc};
use tracing::{error, info, warn};

use crate::strings::client_setup_error;

pub mod chat;
pub mod input;

use input::LineEditor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Input,
    ApiKey,
    Model,
}

impl Focus {
    pub fn label(self) -> &'static str {
        match self {
            Focus::Input => "Question",
            Focus::ApiKey => "API key",
            Focus::Model => "Model",
        }
    }
}

/// Messages from the streaming worker to the UI thread.
#[derive(Debug, PartialEq)]
pub enum StreamEvent {
    Fragment(String),
    Done,
    Failed(ChatError),
}

pub struct App {
    pub session: Session,
    pipelines: PipelineCache<GroqClient>,
    pipeline: Option<Arc<Pipeline<GroqClient>>>,
    pub setup_error: Option<String>,
    pub input: LineEditor,
    pub api_key: LineEditor,
    pub focus: Focus,
    turn: Option<Turn>,
    pub turn_view: String,
    pub turn_error: Option<String>,
    llm_rx: Option<mpsc::Receiver<StreamEvent>>,
    pub should_quit: bool,
    pub show_sidebar: bool,
    pub show_help: bool,
    pub chat_area: Option<Rect>,
    pub chat_scroll: u16,
    pub chat_viewport: u16,
    pub stick_to_bottom: bool,
    pub input_visible_lines: u16,
    pub input_max_lines: u16,
    pub dirty: bool,
}

impl App {
    pub fn new(cfg: GroqConfig) -> Self {
        let session = Session::with_model(cfg.model);
        let pipelines = PipelineCache::new(move |api_key: &str, _model: Model| {
            GroqClient::new(cfg.clone(), api_key).map_err(|e| ChatError::Other(format!("{:#}", e)))
        });
        let mut s = Self {
            session,
            pipelines,
            pipeline: None,
            setup_error: None,
            input: LineEditor::default(),
            api_key: LineEditor::default(),
            focus: Focus::ApiKey,
            turn: None,
            turn_view: String::new(),
            turn_error: None,
            llm_rx: None,
            should_quit: false,
            show_sidebar: true,
            show_help: false,
            chat_area: None,
            chat_scroll: 0,
            chat_viewport: 0,
            stick_to_bottom: true,
            input_visible_lines: 1,
            input_max_lines: 6,
            dirty: true,
        };
        s.refresh_pipeline();
        s
    }

    pub fn has_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn is_streaming(&self) -> bool {
        self.turn.is_some()
    }

    /// Looks up the pipeline for the current key and model.
    pub fn refresh_pipeline(&mut self) {
        match self
            .pipelines
            .build(self.session.credential(), self.session.model())
        {
            Ok(p) => {
                self.pipeline = p;
                self.setup_error = None;
            }
            Err(e) => {
                warn!(target: "tui", "pipeline setup failed: {}", e);
                self.pipeline = None;
                self.setup_error = Some(client_setup_error(&e.to_string()));
            }
        }
        self.dirty = true;
    }

    pub fn commit_api_key(&mut self) {
        if self.api_key.text == self.session.credential() {
            return;
        }
        self.session.set_credential(self.api_key.text.clone());
        info!(target: "tui", "api key updated (present={})", self.session.is_ready());
        self.refresh_pipeline();
    }

    pub fn select_model(&mut self, model: Model) {
        if model == self.session.model() {
            return;
        }
        self.session.set_model(model);
        info!(target: "tui", "model set to {}", model);
        self.refresh_pipeline();
    }

    pub fn reset_chat(&mut self) {
        if self.is_streaming() {
            return;
        }
        self.session.reset();
        self.turn_error = None;
        self.chat_scroll = 0;
        self.stick_to_bottom = true;
        self.dirty = true;
    }

    pub fn submit(&mut self) {
        if self.is_streaming() {
            return;
        }
        let Some(pipeline) = self.pipeline.clone() else {
            return;
        };
        if self.input.text.trim().is_empty() {
            return;
        }
        let question = std::mem::take(&mut self.input.text);
        self.input.clear();
        info!(target: "tui", "submit: model={} input_len={} chars", pipeline.model(), question.len());
        let tx = self.start_turn(&question);
        spawn_stream(pipeline, question, tx);
    }

    // Records the question and opens the channel the worker reports on.
    pub(crate) fn start_turn(&mut self, question: &str) -> mpsc::Sender<StreamEvent> {
        let (tx, rx) = mpsc::channel();
        self.turn_error = None;
        self.turn = Some(Turn::begin(&mut self.session, question));
        self.turn_view.clear();
        self.llm_rx = Some(rx);
        self.stick_to_bottom = true;
        self.chat_scroll = 0;
        self.dirty = true;
        tx
    }

    fn apply_stream_event(&mut self, ev: StreamEvent) {
        match ev {
            StreamEvent::Fragment(s) => {
                if let Some(turn) = &mut self.turn {
                    self.turn_view = turn.push(&s);
                }
            }
            StreamEvent::Done => {
                if let Some(turn) = self.turn.take() {
                    turn.finish(&mut self.session);
                }
                self.end_stream();
            }
            StreamEvent::Failed(e) => {
                error!(target: "tui", "stream error: {}", e);
                if let Some(turn) = self.turn.take() {
                    self.turn_error = Some(turn.fail(&e));
                }
                self.end_stream();
            }
        }
        if self.stick_to_bottom {
            self.chat_scroll = 0;
        }
        self.dirty = true;
    }

    fn end_stream(&mut self) {
        self.llm_rx = None;
        self.turn_view.clear();
    }

    pub fn on_tick(&mut self) {
        let mut events = Vec::new();
        if let Some(rx) = &self.llm_rx {
            for _ in 0..64 {
                match rx.try_recv() {
                    Ok(ev) => {
                        let last = !matches!(ev, StreamEvent::Fragment(_));
                        events.push(ev);
                        if last {
                            break;
                        }
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => {
                        events.push(StreamEvent::Failed(ChatError::Other(
                            "stream ended unexpectedly".into(),
                        )));
                        break;
                    }
                }
            }
        }
        for ev in events {
            self.apply_stream_event(ev);
        }
    }

    pub fn on_paste(&mut self, s: &str) {
        match self.focus {
            Focus::Input => self.input.insert_text(s),
            Focus::ApiKey => self.api_key.insert_text(s.trim()),
            Focus::Model => {}
        }
        self.dirty = true;
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = if self.show_sidebar {
            vec![Focus::Input, Focus::ApiKey, Focus::Model]
        } else {
            vec![Focus::Input]
        };
        if self.focus == Focus::ApiKey {
            self.commit_api_key();
        }
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % order.len()
        } else {
            (pos + order.len() - 1) % order.len()
        };
        self.focus = order[next];
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
        self.stick_to_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        if self.chat_scroll == 0 {
            self.stick_to_bottom = true;
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.dirty = true;

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('l') if ctrl => {
                self.reset_chat();
                return;
            }
            KeyCode::F(1) => {
                self.show_help = true;
                return;
            }
            KeyCode::F(2) => {
                self.show_sidebar = !self.show_sidebar;
                if !self.show_sidebar {
                    if self.focus == Focus::ApiKey {
                        self.commit_api_key();
                    }
                    self.focus = Focus::Input;
                }
                return;
            }
            KeyCode::Tab => {
                self.cycle_focus(true);
                return;
            }
            KeyCode::BackTab => {
                self.cycle_focus(false);
                return;
            }
            KeyCode::PageUp => {
                self.scroll_up(self.chat_viewport.max(1));
                return;
            }
            KeyCode::PageDown => {
                self.scroll_down(self.chat_viewport.max(1));
                return;
            }
            KeyCode::Up if ctrl => {
                self.scroll_up(1);
                return;
            }
            KeyCode::Down if ctrl => {
                self.scroll_down(1);
                return;
            }
            KeyCode::Home if ctrl => {
                self.scroll_up(u16::MAX);
                return;
            }
            KeyCode::End if ctrl => {
                self.scroll_down(u16::MAX);
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Input => match key.code {
                KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                    self.input.insert_text("\n");
                }
                KeyCode::Enter => self.submit(),
                _ => edit_line(&mut self.input, key),
            },
            Focus::ApiKey => match key.code {
                KeyCode::Enter => self.commit_api_key(),
                _ => edit_line(&mut self.api_key, key),
            },
            Focus::Model => match key.code {
                KeyCode::Up | KeyCode::Left => self.select_model(self.session.model().prev()),
                KeyCode::Down | KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') => {
                    self.select_model(self.session.model().next())
                }
                _ => {}
            },
        }
    }
}

fn edit_line(ed: &mut LineEditor, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('w') if ctrl => ed.delete_prev_word(),
        KeyCode::Char('u') if ctrl => ed.kill_to_line_start(),
        KeyCode::Char('k') if ctrl => ed.kill_to_line_end(),
        KeyCode::Char('a') if ctrl => ed.move_line_start(),
        KeyCode::Char('e') if ctrl => ed.move_line_end(),
        KeyCode::Char(_) if ctrl => {}
        KeyCode::Char(ch) => {
            let mut buf = [0u8; 4];
            ed.insert_text(ch.encode_utf8(&mut buf));
        }
        KeyCode::Backspace => ed.delete_left(),
        KeyCode::Delete => ed.delete_right(),
        KeyCode::Left if ctrl => ed.move_word_left(),
        KeyCode::Right if ctrl => ed.move_word_right(),
        KeyCode::Left => ed.move_left(),
        KeyCode::Right => ed.move_right(),
        KeyCode::Home => ed.move_line_start(),
        KeyCode::End => ed.move_line_end(),
        _ => {}
    }
}

// Streams one answer on a worker thread; fragments go back over `tx`.
fn spawn_stream<C: ModelClient + 'static>(
    pipeline: Arc<Pipeline<C>>,
    question: String,
    tx: mpsc::Sender<StreamEvent>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!(target: "tui", "runtime start failed: {}", e);
                let _ = tx.send(StreamEvent::Failed(ChatError::Other(format!("runtime: {}", e))));
                return;
            }
        };
        let res = rt.block_on(
            pipeline.answer(&question, |fragment| tx.send(StreamEvent::Fragment(fragment)).is_ok()),
        );
        let _ = tx.send(match res {
            Ok(()) => StreamEvent::Done,
            Err(e) => StreamEvent::Failed(e),
        });
    })
}
