use std::time::{Duration, Instant};

use crossterm::event::{self, Event, MouseEventKind};
use ratatui::{backend::Backend, Terminal};

use crate::{
    app::{App, Focus},
    ui,
};

const WHEEL_LINES: u16 = 3;

pub fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let mut last_draw = Instant::now();
    let heartbeat = Duration::from_millis(500);
    // Shorter poll while streaming so fragments show up promptly.
    let idle_poll = Duration::from_millis(120);
    let stream_poll = Duration::from_millis(30);
    loop {
        if app.dirty || last_draw.elapsed() >= heartbeat {
            terminal.draw(|f| ui::draw(f, app))?;
            app.dirty = false;
            last_draw = Instant::now();
        }
        if matches!(app.focus, Focus::Input | Focus::ApiKey) && !app.show_help {
            let _ = terminal.show_cursor();
        } else {
            let _ = terminal.hide_cursor();
        }

        let poll = if app.is_streaming() { stream_poll } else { idle_poll };
        if event::poll(poll)? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Paste(s) => app.on_paste(&s),
                Event::Resize(_, _) => app.dirty = true,
                Event::Mouse(me) => {
                    if app.show_help {
                        continue;
                    }
                    let Some(area) = app.chat_area else {
                        continue;
                    };
                    let inside = me.column >= area.x
                        && me.column < area.x + area.width
                        && me.row >= area.y
                        && me.row < area.y + area.height;
                    if inside {
                        match me.kind {
                            MouseEventKind::ScrollUp => {
                                app.scroll_up(WHEEL_LINES);
                                app.dirty = true;
                            }
                            MouseEventKind::ScrollDown => {
                                app.scroll_down(WHEEL_LINES);
                                app.dirty = true;
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        app.on_tick();

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
