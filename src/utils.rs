//! Output helpers for the `jp` binary.

use anyhow::Context as _;
use colored::Colorize;
use serde_json::Value;
use std::io::Write;
use std::io::{self, ErrorKind};

/// Write a query result as colorized JSON followed by a newline. Silently
/// returns `Ok(())` on broken pipe so that piping to tools like `less` or
/// `head` exits cleanly.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_colored_result<W: Write>(
    writer: &mut W,
    value: &Value,
    pretty: bool,
) -> anyhow::Result<()> {
    let mut printer = JsonPrinter { writer, pretty };
    let result = printer
        .print(value, 0)
        .and_then(|()| writeln!(printer.writer));

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err).context("write colorized JSON to stdout"),
    }
}

/// Syntax-highlighting JSON printer. Scalars each get a color; arrays and
/// objects go through one shared layout routine that owns the delimiter,
/// separator, and indentation logic for both the pretty and compact
/// forms.
struct JsonPrinter<'w, W: Write> {
    writer: &'w mut W,
    pretty: bool,
}

impl<W: Write> JsonPrinter<'_, W> {
    fn print(&mut self, value: &Value, indent: usize) -> io::Result<()> {
        match value {
            Value::Null => write!(self.writer, "{}", "null".red().dimmed()),
            Value::Bool(b) => {
                write!(self.writer, "{}", b.to_string().yellow().bold())
            }
            Value::Number(n) => write!(self.writer, "{}", n.to_string().yellow()),
            Value::String(s) => write!(self.writer, "{}", quote(s).green()),
            Value::Array(items) => self.print_collection(
                indent,
                ("[", "]"),
                items.iter(),
                |printer, item, inner| printer.print(item, inner),
            ),
            Value::Object(map) => self.print_collection(
                indent,
                ("{", "}"),
                map.iter(),
                |printer, (key, val), inner| {
                    write!(printer.writer, "{}", quote(key).cyan())?;
                    if printer.pretty {
                        write!(printer.writer, ": ")?;
                    } else {
                        write!(printer.writer, ":")?;
                    }
                    printer.print(val, inner)
                },
            ),
        }
    }

    /// Lay out a delimited, comma-separated collection. Each entry is
    /// rendered by `render` at the inner indent; compact mode simply
    /// skips the line breaks.
    fn print_collection<T>(
        &mut self,
        indent: usize,
        (open, close): (&str, &str),
        items: impl ExactSizeIterator<Item = T>,
        mut render: impl FnMut(&mut Self, T, usize) -> io::Result<()>,
    ) -> io::Result<()> {
        let len = items.len();
        write!(self.writer, "{open}")?;
        for (i, item) in items.enumerate() {
            self.break_line(indent + 2)?;
            render(self, item, indent + 2)?;
            if i + 1 < len {
                write!(self.writer, ",")?;
            }
        }
        if len > 0 {
            self.break_line(indent)?;
        }
        write!(self.writer, "{close}")
    }

    /// In pretty mode, start a new line at the given indent; a no-op in
    /// compact mode.
    fn break_line(&mut self, indent: usize) -> io::Result<()> {
        if self.pretty {
            writeln!(self.writer)?;
            write!(self.writer, "{:indent$}", "")?;
        }
        Ok(())
    }
}

/// JSON-quote a string, escaping as needed.
fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}
