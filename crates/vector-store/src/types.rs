use serde::{Deserialize, Serialize};

/// A ground-truth source/target code pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub output: String,
}

impl Example {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Both sides carry non-whitespace content.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.input.trim().is_empty() && !self.output.trim().is_empty()
    }

    /// Cap `input` at `max_chars` characters. Returns true when something was cut.
    pub fn truncate_input(&mut self, max_chars: usize) -> bool {
        let cut = truncate_chars(&self.input, max_chars).len();
        if cut == self.input.len() {
            return false;
        }
        self.input.truncate(cut);
        true
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// One nearest-neighbor hit joined with its stored example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub position: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
    pub example: Example,
}

/// Hits ordered nearest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub hits: Vec<Hit>,
}

impl RetrievalResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn examples(&self) -> impl Iterator<Item = &Example> {
        self.hits.iter().map(|hit| &hit.example)
    }
}
