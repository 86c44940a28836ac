use anyhow::Context;
use crossterm::{
    ExecutableCommand, cursor,
    terminal::{self, ClearType},
};
use std::io::{Stdout, Write, stdout};

/// Raw mode plus alternate screen for the lifetime of the value. Everything it
/// enabled is undone on drop, including on early error returns.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        let guard = Self { _private: () };

        let mut out = stdout();
        out.execute(terminal::EnterAlternateScreen)
            .context("enter alternate screen")?;
        out.execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        out.execute(cursor::Hide).context("hide cursor")?;
        log::debug!("terminal entered raw mode");
        Ok(guard)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }

    /// Current size in cells, never zero.
    pub fn size() -> anyhow::Result<(u16, u16)> {
        let (cols, rows) = terminal::size().context("query terminal size")?;
        Ok((cols.max(1), rows.max(1)))
    }

    pub fn clear(out: &mut Stdout) -> anyhow::Result<()> {
        out.execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        // Synchronized output and autowrap may still be toggled by an interrupted frame.
        let _ = out.write_all(b"\x1b[?2026l\x1b[?7h\x1b[0m");
        let _ = out.flush();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        log::debug!("terminal restored");
    }
}
