//! # Scratchpad Demo
//!
//! A tiny modal text pad with escapist wired in:
//! - Keys go to a [`Runtime`] through its [`RuntimeHandle`], which applies
//!   them to a shared [`ScratchBuffer`] in order with any escape it feeds
//! - Typing `jk` (or `jj`) quickly leaves insert, replace, command-line and
//!   terminal mode
//! - Escaping straight after entering insert mode leaves the buffer unmodified
//!
//! An optional first argument names a TOML configuration file; otherwise the
//! platform config path is tried. Logs go to `escapist-scratchpad.log` in the
//! temp directory (`RUST_LOG` overrides the filter).
//!
//! Run with: `cargo run --example scratchpad [config.toml]`

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use escapist::testing::ScratchBuffer;
use escapist::{Config, ConfigError, Mode, Runtime, RuntimeHandle};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use std::error::Error;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use unicode_width::UnicodeWidthStr;

type Shared = Arc<Mutex<ScratchBuffer>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;
    let config = load_config()?;

    let buffer: Shared = Arc::new(Mutex::new(ScratchBuffer::new()));
    let (runtime, diagnostics) = Runtime::new(buffer.clone(), config);
    let handle = runtime.handle();
    let task = tokio::spawn(runtime.run());

    let mut terminal = init_terminal()?;
    let result = event_loop(&mut terminal, &buffer, &handle, &diagnostics).await;
    restore_terminal();

    handle.kill();
    drop(handle);
    let _ = task.await;
    result
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let path = std::env::temp_dir().join("escapist-scratchpad.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("escapist_core=debug,info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();
    tracing::info!(path = ?path, "scratchpad logging initialized");
    Ok(())
}

fn load_config() -> Result<Config, Box<dyn Error>> {
    if let Some(path) = std::env::args_os().nth(1) {
        return Ok(Config::load(&PathBuf::from(path))?);
    }
    match Config::default_path() {
        Some(path) => Ok(Config::load_or_default(&path)?),
        None => Ok(Config::new()),
    }
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    buffer: &Shared,
    handle: &RuntimeHandle,
    diagnostics: &[ConfigError],
) -> Result<(), Box<dyn Error>> {
    let mut events = EventStream::new();
    // Keys land asynchronously, so redraw on a frame tick.
    let mut frame_interval = tokio::time::interval(Duration::from_millis(33));
    frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if is_quit(key) {
                        return Ok(());
                    }
                    handle.input(key);
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(()),
            },

            _ = frame_interval.tick() => {
                let snapshot = buffer.lock().unwrap_or_else(PoisonError::into_inner).clone();
                terminal.draw(|frame| view(frame, &snapshot, diagnostics))?;
            }
        }
    }
}

fn is_quit(key: KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('q')
}

fn view(frame: &mut Frame, buffer: &ScratchBuffer, diagnostics: &[ConfigError]) {
    let [text_area, status_area, help_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let title = if buffer.modified() {
        " Scratchpad [+] "
    } else {
        " Scratchpad "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);
    let lines: Vec<Line> = buffer.lines().iter().map(|l| Line::raw(l.clone())).collect();
    frame.render_widget(Paragraph::new(lines).block(block), text_area);

    let mode_style = Style::default()
        .fg(Color::Black)
        .bg(mode_color(buffer.mode()))
        .add_modifier(Modifier::BOLD);
    let mut status = vec![Span::styled(format!(" {} ", buffer.mode().name().to_uppercase()), mode_style)];
    let prompt = match buffer.mode() {
        Mode::CommandLine => Some(format!(" :{}", buffer.prompt())),
        Mode::Terminal => Some(format!(" $ {}", buffer.prompt())),
        _ => None,
    };
    if let Some(prompt) = &prompt {
        status.push(Span::raw(prompt.clone()));
    } else if let Some(error) = diagnostics.first() {
        status.push(Span::styled(format!(" config: {error}"), Style::default().fg(Color::Red)));
    } else if let Some(last) = buffer.submitted().last() {
        status.push(Span::styled(format!(" ran: {last}"), Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(Paragraph::new(Line::from(status)), status_area);

    let help = "i insert | R replace | : command | t terminal | jk escape | Ctrl-Q quit";
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        help_area,
    );

    match prompt {
        Some(prompt) => {
            let x = status_area.x + buffer.mode().name().width() as u16 + 2 + prompt.width() as u16;
            frame.set_cursor_position((x, status_area.y));
        }
        None => place_text_cursor(frame, buffer, text_area),
    }
}

fn place_text_cursor(frame: &mut Frame, buffer: &ScratchBuffer, area: Rect) {
    let cursor = buffer.cursor_position();
    let Some(line) = buffer.lines().get(cursor.line) else {
        return;
    };
    let prefix: String = line.chars().take(cursor.column).collect();
    let x = area.x + 1 + prefix.width() as u16;
    let y = area.y + 1 + cursor.line as u16;
    frame.set_cursor_position((x, y));
}

fn mode_color(mode: Mode) -> Color {
    match mode {
        Mode::Normal => Color::Blue,
        Mode::Insert => Color::Green,
        Mode::Replace => Color::Red,
        Mode::CommandLine => Color::Yellow,
        Mode::Terminal => Color::Magenta,
        Mode::Visual | Mode::Select => Color::Cyan,
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, Box<dyn Error>> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        original_hook(info);
    }));

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

fn restore_terminal() {
    // Best effort: restore as much terminal state as possible.
    let _ = disable_raw_mode();
    let _ = execute!(stdout(), LeaveAlternateScreen);
}
