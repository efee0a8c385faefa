use serde::Serialize;

/// One human-readable line of the workflow log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Originating node name, or `system` for synthesized lines.
    pub tag: String,
    pub text: String,
    /// Server timestamp in milliseconds, when the event carried one.
    pub timestamp: Option<i64>,
}

/// Append-only run log. Phase and progress derivation read it; nothing
/// rewrites past entries.
#[derive(Debug, Clone, Default)]
pub struct WorkflowLog {
    entries: Vec<LogEntry>,
}

impl WorkflowLog {
    pub fn push(&mut self, tag: impl Into<String>, text: impl Into<String>, timestamp: Option<i64>) {
        self.entries.push(LogEntry {
            tag: tag.into(),
            text: text.into(),
            timestamp,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
