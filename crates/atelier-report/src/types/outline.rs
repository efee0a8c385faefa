use serde::{Deserialize, Serialize};

/// One top-level heading of the planned report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub level1_title: String,
    #[serde(default)]
    pub level2_titles: Vec<String>,
}

/// Generated report outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub sections: Vec<OutlineSection>,
    #[serde(default)]
    pub estimated_words: u64,
    #[serde(default)]
    pub outline_markdown: String,
}

/// Section reference as it appears inside workflow state snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRef {
    pub level1_title: String,
    #[serde(default)]
    pub level2_titles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

/// A section after the writing phase, with its citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrittenSection {
    pub level1_title: String,
    #[serde(default)]
    pub level2_titles: Vec<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// One retrieved source (knowledge base or web).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalHit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Payload for starting (or resuming, with a confirmed outline) a
/// deep-research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub requirement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
}

impl ResearchRequest {
    pub fn new(requirement: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            task_id: None,
            outline: None,
        }
    }

    /// Attach a confirmed outline, generating a task id if none is set.
    pub fn with_outline(mut self, outline: Outline) -> Self {
        if self.task_id.is_none() {
            self.task_id = Some(format!("task_{}", uuid::Uuid::new_v4()));
        }
        self.outline = Some(outline);
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}
