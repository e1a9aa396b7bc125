use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
    },
    Frame,
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use qa_core::model::Model;

use crate::app::chat::{chat_window, EntryKind};
use crate::app::{App, Focus};
use crate::strings::{
    build_status_line, build_stick_label, help_lines_ascii, APP_DESCRIPTION, APP_TITLE,
    EXAMPLES_TITLE, EXAMPLE_QUESTIONS, FOOTER, HINT_API_KEY, HINT_MODEL, INPUT_HINT, LABEL_API_KEY,
    LABEL_CLEAR, LABEL_MODEL, MISSING_API_KEY, TITLE_CHAT, TITLE_HELP, TITLE_INPUT, TITLE_SETTINGS,
};
use crate::theme::THEME;

pub fn draw(f: &mut Frame, app: &mut App) {
    // Layout: optional settings sidebar (32), main
    let mut constraints: Vec<Constraint> = Vec::new();
    if app.show_sidebar {
        constraints.push(Constraint::Length(32));
    }
    constraints.push(Constraint::Min(20));
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(f.area());
    let main_area = if app.show_sidebar {
        draw_settings(f, chunks[0], app);
        chunks[1]
    } else {
        chunks[0]
    };
    draw_main(f, main_area, app);

    if app.show_help {
        draw_help(f, f.area());
    }
}

fn border_for(focused: bool) -> Style {
    if focused {
        Style::default().fg(THEME.border_focus)
    } else {
        Style::default().fg(THEME.border_inactive)
    }
}

fn title_style() -> Style {
    Style::default()
        .fg(THEME.title)
        .add_modifier(Modifier::BOLD)
}

fn draw_settings(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(Span::styled(TITLE_SETTINGS, title_style()))
        .borders(Borders::ALL)
        .border_style(border_for(false));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let models = Model::all();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Length(models.len() as u16 + 2),
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    // API key: masked, with the cursor placed on the bullet row.
    let key_focused = app.focus == Focus::ApiKey;
    let key_block = Block::default()
        .title(LABEL_API_KEY)
        .borders(Borders::ALL)
        .border_style(border_for(key_focused));
    let masked = app.api_key.masked();
    let width = rows[0].width.saturating_sub(2) as usize;
    let cursor = app.api_key.cursor.min(app.api_key.len());
    let skip = cursor.saturating_sub(width.saturating_sub(1));
    let visible: String = masked.chars().skip(skip).take(width).collect();
    f.render_widget(Paragraph::new(visible).block(key_block), rows[0]);
    if key_focused {
        let x = rows[0].x + 1 + (cursor - skip) as u16;
        f.set_cursor_position(Position::new(x, rows[0].y + 1));
    }
    f.render_widget(
        Paragraph::new(HINT_API_KEY)
            .style(Style::default().fg(THEME.muted))
            .wrap(Wrap { trim: true }),
        rows[1],
    );

    let model_focused = app.focus == Focus::Model;
    let model_block = Block::default()
        .title(LABEL_MODEL)
        .borders(Borders::ALL)
        .border_style(border_for(model_focused));
    let current = app.session.model();
    let lines: Vec<Line> = models
        .iter()
        .map(|m| {
            let selected = *m == current;
            let style = if selected && model_focused {
                Style::default()
                    .fg(THEME.selected_fg)
                    .bg(THEME.selected_bg)
                    .add_modifier(Modifier::BOLD)
            } else if selected {
                Style::default()
                    .fg(THEME.border_focus)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if selected { "(*) " } else { "( ) " };
            Line::from(Span::styled(format!("{}{}", marker, m), style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(model_block), rows[2]);
    f.render_widget(
        Paragraph::new(HINT_MODEL)
            .style(Style::default().fg(THEME.muted))
            .wrap(Wrap { trim: true }),
        rows[3],
    );
    let clear_style = if app.is_streaming() {
        Style::default().fg(THEME.muted)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    f.render_widget(
        Paragraph::new(Span::styled(format!("[ {} ]", LABEL_CLEAR), clear_style)),
        rows[4],
    );
}

fn draw_main(f: &mut Frame, area: Rect, app: &mut App) {
    let inner_width = area.width.saturating_sub(2);
    let input_total_lines = measure_total_lines(&app.input.text, inner_width).max(1) as u16;
    let target_lines = input_total_lines.min(app.input_max_lines);
    let current = app.input_visible_lines.max(1);
    app.input_visible_lines = if current < target_lines {
        current + 1
    } else if current > target_lines {
        current - 1
    } else {
        current
    };
    let input_height = app.input_visible_lines + 2;

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(input_height),
        ])
        .split(area);

    let header = vec![
        Line::from(Span::styled(APP_TITLE, title_style())),
        Line::from(Span::styled(
            APP_DESCRIPTION,
            Style::default().fg(THEME.muted),
        )),
    ];
    f.render_widget(Paragraph::new(header), main_chunks[0]);

    app.chat_area = Some(main_chunks[1]);
    draw_chat(f, main_chunks[1], app);
    draw_status(f, main_chunks[2], app);
    draw_input(f, main_chunks[3], app);
}

fn draw_chat(f: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .title(TITLE_CHAT)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.chat_border));
    let inner = block.inner(area);

    let mut all: Vec<Line<'static>> = Vec::new();
    if !app.has_pipeline() {
        let msg = app.setup_error.as_deref().unwrap_or(MISSING_API_KEY);
        for l in textwrap::wrap(msg, inner.width.max(1) as usize) {
            all.push(Line::from(Span::styled(
                l.into_owned(),
                Style::default().fg(THEME.error),
            )));
        }
    } else {
        for e in app.wrapped_transcript(inner.width) {
            let color = match e.kind {
                EntryKind::User => THEME.user,
                EntryKind::Assistant | EntryKind::Pending => THEME.assistant,
                EntryKind::Error => THEME.error,
            };
            let header_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
            let body_style = match e.kind {
                EntryKind::Error => Style::default().fg(THEME.error),
                EntryKind::Pending => Style::default().add_modifier(Modifier::ITALIC),
                _ => Style::default(),
            };
            let hb = UnicodeWidthStr::width(e.kind.prefix());
            for (i, line) in e.lines.into_iter().enumerate() {
                if i == 0 && line.len() >= hb && line.is_char_boundary(hb) {
                    all.push(Line::from(vec![
                        Span::styled(line[..hb].to_string(), header_style),
                        Span::styled(line[hb..].to_string(), body_style),
                    ]));
                } else {
                    all.push(Line::from(Span::styled(line, body_style)));
                }
            }
        }
    }
    // Examples and footer always sit below the conversation.
    if !all.is_empty() {
        all.push(Line::from(""));
    }
    all.extend(examples_lines());

    let viewport = inner.height as usize;
    app.chat_viewport = inner.height;
    if app.stick_to_bottom {
        app.chat_scroll = 0;
    }
    let (start, scroll) = chat_window(all.len(), viewport, app.chat_scroll);
    app.chat_scroll = scroll;
    let total = all.len();
    let visible: Vec<Line> = all.into_iter().skip(start).take(viewport).collect();
    f.render_widget(Paragraph::new(visible).block(block), area);

    if total > viewport {
        let mut sb_state = ScrollbarState::new(total).position(start);
        let sb = Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(sb, inner, &mut sb_state);
    }
}

fn examples_lines() -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(EXAMPLES_TITLE, title_style()))];
    for q in EXAMPLE_QUESTIONS {
        lines.push(Line::from(format!("  - {}", q)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        FOOTER,
        Style::default().fg(THEME.muted),
    )));
    lines
}

fn draw_input(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Input;
    let block = Block::default()
        .title(TITLE_INPUT)
        .borders(Borders::ALL)
        .border_style(border_for(focused));
    let inner_width = area.width.saturating_sub(2);
    let graphemes: Vec<&str> = app.input.text.graphemes(true).collect();
    let upto = app.input.cursor.min(graphemes.len());
    let (line_idx, col_width) = measure_prefix_line_col(&graphemes, upto, inner_width);
    let offset_y = line_idx.saturating_sub(app.input_visible_lines.saturating_sub(1));

    let para = if app.input.is_empty() {
        let hint = if app.has_pipeline() { INPUT_HINT } else { MISSING_API_KEY };
        Paragraph::new(Line::from(Span::styled(
            hint,
            Style::default().fg(THEME.muted),
        )))
        .block(block)
    } else {
        Paragraph::new(app.input.text.clone())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((offset_y, 0))
    };
    f.render_widget(para, area);

    if focused {
        let cursor_x = area.x + 1 + col_width;
        let cursor_y = area.y + 1 + line_idx.saturating_sub(offset_y);
        f.set_cursor_position(Position::new(cursor_x, cursor_y));
    }
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let stick = build_stick_label(app.chat_scroll);
    let turns = app
        .session
        .messages()
        .iter()
        .filter(|m| m.role == qa_core::llm::Role::Assistant)
        .count();
    let tips = build_status_line(
        &stick,
        app.focus.label(),
        app.session.model().id(),
        app.session.is_ready(),
        app.is_streaming(),
        turns,
        area.width,
    );
    let para = Paragraph::new(Line::from(Span::styled(
        tips,
        Style::default().fg(THEME.muted),
    )));
    f.render_widget(para, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(70, 70, area);
    let block = Block::default()
        .title(Span::styled(TITLE_HELP, title_style()))
        .borders(Borders::ALL);
    let lines = help_lines_ascii()
        .iter()
        .map(|s| Line::from(*s))
        .collect::<Vec<Line>>();
    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, popup_area);
    f.render_widget(para, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1]);
    horiz[1]
}

fn measure_total_lines(s: &str, width: u16) -> usize {
    let graphemes: Vec<&str> = s.graphemes(true).collect();
    measure_prefix_line_col(&graphemes, graphemes.len(), width).0 as usize + 1
}

fn measure_prefix_line_col(graphemes: &[&str], upto: usize, width: u16) -> (u16, u16) {
    if width == 0 {
        return (0, 0);
    }
    let mut line = 0usize;
    let mut col = 0usize;
    for g in graphemes.iter().take(upto) {
        if *g == "\n" {
            line += 1;
            col = 0;
            continue;
        }
        let w = UnicodeWidthStr::width(*g);
        if col + w > width as usize {
            line += 1;
            col = 0;
        }
        col += w;
    }
    (line as u16, col as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::groq::GroqConfig;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(app: &mut App) -> String {
        let mut term = Terminal::new(TestBackend::new(100, 30)).unwrap();
        term.draw(|f| draw(f, app)).unwrap();
        let buf = term.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn measures_wrapped_input() {
        let s = "abcdef";
        let g: Vec<&str> = s.graphemes(true).collect();
        assert_eq!(measure_total_lines(s, 5), 2);
        assert_eq!(measure_prefix_line_col(&g, 5, 5), (0, 5));
        assert_eq!(measure_prefix_line_col(&g, 6, 5), (1, 1));
        assert_eq!(measure_total_lines("ab\ncd", 80), 2);
    }

    #[test]
    fn shows_instruction_without_key() {
        let mut app = App::new(GroqConfig::default());
        let s = screen(&mut app);
        assert!(s.contains(MISSING_API_KEY));
        assert!(s.contains(EXAMPLES_TITLE));
        assert!(s.contains(FOOTER));
        assert!(s.contains("llama3-8b-8192"));
        assert!(s.contains("gemma2-9b-it"));
    }

    #[test]
    fn shows_examples_then_transcript() {
        let mut app = App::new(GroqConfig::default());
        app.on_paste("gsk_secret");
        app.commit_api_key();
        let s = screen(&mut app);
        assert!(s.contains(EXAMPLES_TITLE));
        assert!(!s.contains("gsk_secret"));
        assert!(s.contains("••••••••••"));

        let tx = app.start_turn("What is LangChain?");
        tx.send(crate::app::StreamEvent::Fragment("Lang".into())).unwrap();
        app.on_tick();
        let s = screen(&mut app);
        assert!(s.contains("| What is LangChain?"));
        assert!(s.contains("> Lang..."));
        assert!(s.contains(EXAMPLES_TITLE));
    }
}
