/// UI collaborator driven by a session.
///
/// Implementations own everything visual (message bubbles, indicators,
/// buttons). The session only tells them what happened.
pub trait Renderer: Send {
    /// Shows the whole response accumulated so far.
    ///
    /// Called with the full text on every token rather than a diff, so
    /// formatting that spans several chunks (a code fence opened in one chunk
    /// and closed in a later one) always renders from a consistent state.
    fn render(&mut self, accumulated: &str);

    /// Shows a terminal failure for the current response.
    fn report_error(&mut self, message: &str);

    /// Re-enables input and stops progress indicators. Called exactly once per
    /// session with the number of words committed to the running counter.
    fn finalize(&mut self, words_added: usize);
}

/// Number of whitespace-separated words in `text`.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Running word counter shown next to the conversation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WordCounter {
    total: usize,
}

impl WordCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the words of `text` and returns how many were added.
    pub fn commit(&mut self, text: &str) -> usize {
        let added = count_words(text);
        self.total = self.total.saturating_add(added);
        added
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn reset(&mut self) {
        self.total = 0;
    }
}

/// A renderer that records every call instead of drawing anything.
///
/// Useful for headless callers that only need the final text, and in tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingRenderer {
    /// Every accumulated text passed to `render`, in order.
    pub frames: Vec<String>,
    /// Every message passed to `report_error`, in order.
    pub errors: Vec<String>,
    /// Every `words_added` value passed to `finalize`.
    pub finalized: Vec<usize>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last rendered text, or an empty string when nothing was rendered.
    pub fn last_frame(&self) -> &str {
        self.frames.last().map(String::as_str).unwrap_or("")
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, accumulated: &str) {
        self.frames.push(accumulated.to_string());
    }

    fn report_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn finalize(&mut self, words_added: usize) {
        self.finalized.push(words_added);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_words_ignores_runs_of_whitespace() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   \n\t "), 0);
        assert_eq!(count_words("  hello   world\nagain "), 3);
    }

    #[test]
    fn counter_accumulates_and_resets() {
        let mut counter = WordCounter::new();
        assert_eq!(counter.commit("one two"), 2);
        assert_eq!(counter.commit("three"), 1);
        assert_eq!(counter.total(), 3);
        counter.reset();
        assert_eq!(counter.total(), 0);
    }

    #[test]
    fn recording_renderer_keeps_call_order() {
        let mut renderer = RecordingRenderer::new();
        assert_eq!(renderer.last_frame(), "");
        renderer.render("a");
        renderer.render("ab");
        renderer.report_error("boom");
        renderer.finalize(1);
        assert_eq!(renderer.frames, vec!["a", "ab"]);
        assert_eq!(renderer.last_frame(), "ab");
        assert_eq!(renderer.errors, vec!["boom"]);
        assert_eq!(renderer.finalized, vec![1]);
    }
}
