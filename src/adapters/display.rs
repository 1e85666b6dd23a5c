//! Terminal Display - Presentation Layer for Price Updates
//!
//! Renders each update as a currency-formatted line and the connection
//! indicator as a status line. Generic over `io::Write` so the same
//! renderer serves stdout and tests.

use std::io::{self, Write};

use crate::domain::price::{ConnectionState, PriceUpdate};

/// Line-oriented renderer for the price client's callbacks.
pub struct TerminalDisplay<W: Write> {
    out: W,
}

impl TerminalDisplay<io::Stdout> {
    /// Render to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalDisplay<W> {
    /// Render to an arbitrary writer.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Write one price line: `BTCUSDT  $50,000.12  (updated 14:03:07 UTC)`.
    ///
    /// # Errors
    /// Propagates write failures from the underlying writer.
    pub fn render_update(&mut self, update: &PriceUpdate) -> io::Result<()> {
        writeln!(
            self.out,
            "{}  {}  (updated {})",
            update.symbol.to_uppercase(),
            format_usd(update.price),
            update.received_at.format("%H:%M:%S UTC"),
        )?;
        self.out.flush()
    }

    /// Write the connection indicator line.
    ///
    /// # Errors
    /// Propagates write failures from the underlying writer.
    pub fn render_status(&mut self, state: ConnectionState) -> io::Result<()> {
        let marker = match state {
            ConnectionState::Connected => "[LIVE]",
            ConnectionState::Polling => "[POLL]",
            ConnectionState::Connecting | ConnectionState::Disconnected => "[DOWN]",
        };
        writeln!(self.out, "{marker} {}", state.label())?;
        self.out.flush()
    }

    /// Consume the display and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format a price as US dollars with 2 to 8 fraction digits.
pub fn format_usd(price: f64) -> String {
    let fixed = format!("{price:.8}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < 2 {
        frac.push('0');
    }

    format!("${}.{frac}", group_thousands(int_part))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(50000.12), "$50,000.12");
        assert_eq!(format_usd(1_234_567.5), "$1,234,567.50");
        assert_eq!(format_usd(3.0), "$3.00");
        assert_eq!(format_usd(0.000_123_45), "$0.00012345");
        assert_eq!(format_usd(999.0), "$999.00");
    }

    #[test]
    fn test_render_update_line() {
        let update = PriceUpdate {
            symbol: "btcusdt".to_string(),
            price: 50000.12,
            received_at: Utc.with_ymd_and_hms(2024, 3, 1, 14, 3, 7).unwrap(),
        };
        let mut display = TerminalDisplay::new(Vec::new());
        display.render_update(&update).unwrap();

        let text = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(text, "BTCUSDT  $50,000.12  (updated 14:03:07 UTC)\n");
    }

    #[test]
    fn test_render_status_line() {
        let mut display = TerminalDisplay::new(Vec::new());
        display.render_status(ConnectionState::Polling).unwrap();
        display.render_status(ConnectionState::Connected).unwrap();

        let text = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(
            text,
            "[POLL] Polling (Fallback Mode)\n[LIVE] Real-Time Connected\n"
        );
    }
}
