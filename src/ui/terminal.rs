use crate::models::KeyToken;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, queue, terminal};
use eyre::{Result, WrapErr};
use std::io::Write;

/// Scoped ownership of the terminal's raw input mode. Acquired when a
/// session starts and released on drop, so every exit path (including
/// errors) restores the terminal.
pub struct InputGuard {
    _private: (),
}

impl InputGuard {
    pub fn acquire() -> Result<Self> {
        terminal::enable_raw_mode()
            .wrap_err("Could not enable raw terminal mode; the reader needs exclusive key input")?;
        Ok(Self { _private: () })
    }
}

impl Drop for InputGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Block until the next key press and normalize it. Release/repeat events
/// and keys we cannot represent are skipped.
pub fn read_token() -> Result<KeyToken> {
    loop {
        if let Event::Key(key) = crossterm::event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(token) = token_from_key(key)
        {
            return Ok(token);
        }
    }
}

pub fn token_from_key(key: KeyEvent) -> Option<KeyToken> {
    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyToken::Ctrl(c.to_ascii_lowercase()))
        }
        KeyCode::Char(c) => Some(KeyToken::Char(c)),
        KeyCode::Up => Some(KeyToken::Named("up")),
        KeyCode::Down => Some(KeyToken::Named("down")),
        KeyCode::Left => Some(KeyToken::Named("left")),
        KeyCode::Right => Some(KeyToken::Named("right")),
        KeyCode::Home => Some(KeyToken::Named("home")),
        KeyCode::End => Some(KeyToken::Named("end")),
        KeyCode::Enter => Some(KeyToken::Named("enter")),
        KeyCode::Esc => Some(KeyToken::Named("esc")),
        KeyCode::Tab => Some(KeyToken::Named("tab")),
        KeyCode::Backspace => Some(KeyToken::Named("backspace")),
        KeyCode::PageUp => Some(KeyToken::Named("pageup")),
        KeyCode::PageDown => Some(KeyToken::Named("pagedown")),
        _ => None,
    }
}

pub fn clear_screen(out: &mut impl Write) -> Result<()> {
    queue!(
        out,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )?;
    Ok(())
}

pub fn terminal_size() -> (u16, u16) {
    terminal::size().unwrap_or((100, 30))
}
