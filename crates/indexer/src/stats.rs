use serde::{Deserialize, Serialize};

/// Statistics about an index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Examples handed to the builder
    pub total: usize,

    /// Examples that made it into the index
    pub indexed: usize,

    /// Examples dropped because their embedding failed
    pub failed: usize,

    /// Indexed examples whose input was cut to the character budget
    pub truncated: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Per-example failures, in dataset order
    pub failures: Vec<BuildFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFailure {
    /// Zero-based position of the example in the input dataset
    pub ordinal: usize,
    pub reason: String,
}

impl BuildStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn add_indexed(&mut self, truncated: bool) {
        self.indexed += 1;
        if truncated {
            self.truncated += 1;
        }
    }

    pub fn add_failure(&mut self, ordinal: usize, reason: String) {
        self.failed += 1;
        self.failures.push(BuildFailure { ordinal, reason });
    }

    /// Every example was either indexed or recorded as failed.
    pub fn is_settled(&self) -> bool {
        self.indexed + self.failed == self.total
    }
}
