//! Colored status lines
//!
//! Success lines go to stdout, warnings and failures to stderr. Color is only
//! emitted when the stream is a terminal.

use std::io::{IsTerminal, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn choice(is_terminal: bool) -> ColorChoice {
    if is_terminal { ColorChoice::Auto } else { ColorChoice::Never }
}

fn status(mut stream: StandardStream, color: Color, icon: &str, message: &str) {
    let _ = stream.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stream, "{icon}");
    let _ = stream.reset();
    let _ = writeln!(stream, " {message}");
}

/// `✓ message` on stdout
pub fn success(message: impl AsRef<str>) {
    let stdout = StandardStream::stdout(choice(std::io::stdout().is_terminal()));
    status(stdout, Color::Green, "✓", message.as_ref());
}

/// `! message` on stderr
pub fn warning(message: impl AsRef<str>) {
    let stderr = StandardStream::stderr(choice(std::io::stderr().is_terminal()));
    status(stderr, Color::Yellow, "!", message.as_ref());
}

/// `✗ message` on stderr
pub fn failure(message: impl AsRef<str>) {
    let stderr = StandardStream::stderr(choice(std::io::stderr().is_terminal()));
    status(stderr, Color::Red, "✗", message.as_ref());
}

/// Plain line on stdout
pub fn info(message: impl AsRef<str>) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", message.as_ref());
}
