//! Single-keystroke control on a raw-mode terminal.

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::warn;

use crate::sort_mode::{SortControl, SortMode};

pub const TOGGLE_KEY: char = 's';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Toggled(SortMode),
    Quit,
    Ignored,
}

pub fn handle_key(sort: &SortControl, key: KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::Ignored;
    }
    match key.code {
        KeyCode::Char(TOGGLE_KEY) => KeyAction::Toggled(sort.toggle()),
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        _ => KeyAction::Ignored,
    }
}

/// Puts the terminal in raw mode for as long as it lives.
pub struct RawMode;

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawMode)
    }

    /// For exit paths that skip destructors.
    pub fn restore() {
        let _ = disable_raw_mode();
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        RawMode::restore();
    }
}

/// Blocks on terminal input until quit is requested or input fails. The
/// terminal leaves raw mode either way.
pub fn read_keys<W: Write>(sort: Arc<SortControl>, out: &mut W) -> io::Result<()> {
    let result = read_keys_from(event::read, &sort, out);
    RawMode::restore();
    result
}

/// The key loop over any event source.
pub fn read_keys_from<F, W>(mut next: F, sort: &SortControl, out: &mut W) -> io::Result<()>
where
    F: FnMut() -> io::Result<Event>,
    W: Write,
{
    loop {
        let ev = match next() {
            Ok(ev) => ev,
            Err(e) => {
                warn!("keyboard input: {}", e);
                return Err(e);
            }
        };
        let Event::Key(key) = ev else { continue };
        match handle_key(sort, key) {
            KeyAction::Toggled(mode) => {
                writeln!(out, "Sorting by {}", mode)?;
                out.flush()?;
            }
            KeyAction::Quit => return Ok(()),
            KeyAction::Ignored => {}
        }
    }
}

/// Raw mode turns off output post-processing, so a bare `\n` no longer
/// returns the cursor. This writer emits `\r\n` instead.
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        CrlfWriter { inner }
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, b) in buf.iter().enumerate() {
            if *b == b'\n' {
                self.inner.write_all(&buf[start..i])?;
                self.inner.write_all(b"\r\n")?;
                start = i + 1;
            }
        }
        self.inner.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
