use std::io::Write;

use chatstream_core::Renderer;

/// Renders the answer on a terminal.
///
/// A terminal cannot redraw a paragraph in place, so when the accumulated
/// text extends what is already on screen only the new suffix is printed;
/// anything else reprints the whole text on a fresh line.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    shown: String,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render(&mut self, accumulated: &str) {
        let _ = match accumulated.strip_prefix(self.shown.as_str()) {
            Some(suffix) => write!(self.out, "{suffix}"),
            None => write!(self.out, "\n{accumulated}"),
        };
        let _ = self.out.flush();
        self.shown.clear();
        self.shown.push_str(accumulated);
    }

    fn report_error(&mut self, message: &str) {
        if !self.shown.is_empty() {
            let _ = writeln!(self.out);
        }
        let _ = writeln!(self.out, "error: {message}");
        self.shown.clear();
    }

    fn finalize(&mut self, words_added: usize) {
        if !self.shown.is_empty() {
            let _ = writeln!(self.out);
        }
        let _ = writeln!(self.out, "[+{words_added} words]");
        let _ = self.out.flush();
        self.shown.clear();
    }
}
