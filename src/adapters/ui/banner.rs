//! ASCII banner (PAYOUT-GATE) with a vertical color gradient.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Ledger green (#2ecc71).
const LEDGER_GREEN: (u8, u8, u8) = (0x2e, 0xcc, 0x71);
/// Ink blue (#1f6feb).
const INK_BLUE: (u8, u8, u8) = (0x1f, 0x6f, 0xeb);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

/// Prints the welcome banner followed by the crate version.
/// Falls back to plain text if the built-in font cannot render.
pub fn print_welcome() {
    let mut out = stdout();
    let art = FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("PAYOUT-GATE").map(|f| f.to_string()))
        .unwrap_or_else(|| "PAYOUT-GATE\n".to_string());
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(LEDGER_GREEN, INK_BLUE, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let _ = out.execute(Print(format!(
        "v{} · tax form checks before payout\r\n",
        env!("CARGO_PKG_VERSION")
    )));
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp_rgb(LEDGER_GREEN, INK_BLUE, 0.0), LEDGER_GREEN);
        assert_eq!(lerp_rgb(LEDGER_GREEN, INK_BLUE, 1.0), INK_BLUE);
    }
}
