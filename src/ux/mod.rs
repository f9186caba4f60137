//! Messages for the person running devbox.

use console::style;
use std::fmt::Display;
use std::io::Write;

use tracing::warn;

/// Writes `msg` after a highlighted `Info:` label. The message carries its
/// own trailing newline. A failed write is logged and otherwise ignored.
pub fn info(writer: &mut dyn Write, msg: impl Display) {
    if let Err(err) = write!(writer, "{} {}", style("Info:").yellow(), msg) {
        warn!(%err, "failed to write info message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_info() {
        let mut out = Vec::new();
        info(&mut out, format_args!("Added platform {} to package {}\n", "x86_64-linux", "go"));
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            console::strip_ansi_codes(&text),
            "Info: Added platform x86_64-linux to package go\n"
        );
    }
}
