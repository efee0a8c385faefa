use serde::Serialize;

use crate::log::WorkflowLog;
use crate::markers;

/// Writing-flow phases of one chapter, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Prepare,
    InitialSearch,
    ReasoningSearch,
    Writing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Not yet reached.
    #[default]
    Hidden,
    /// Marker seen, next marker not yet seen.
    Loading,
    /// Next marker seen.
    Completed,
}

/// Status of the four phases for one chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseStates {
    pub prepare: PhaseStatus,
    pub initial_search: PhaseStatus,
    pub reasoning_search: PhaseStatus,
    pub writing: PhaseStatus,
}

impl PhaseStates {
    pub fn get(&self, phase: Phase) -> PhaseStatus {
        match phase {
            Phase::Prepare => self.prepare,
            Phase::InitialSearch => self.initial_search,
            Phase::ReasoningSearch => self.reasoning_search,
            Phase::Writing => self.writing,
        }
    }
}

/// Derive the phase states for `chapter_index` (1-based) from the
/// accumulated log.
///
/// Only the log range between this chapter's boundary line and the next
/// chapter's boundary is considered. When the boundary is absent every
/// phase reports `Hidden` — there is no fallback to structured event
/// data (the markers ARE the contract here; see `markers`).
pub fn phase_states(log: &WorkflowLog, chapter_index: usize) -> PhaseStates {
    let mut phases = PhaseStates::default();
    if chapter_index == 0 {
        return phases;
    }

    let start_marker = markers::chapter_start_marker(chapter_index);
    let entries = log.entries();

    let mut start = None;
    let mut end = entries.len();
    for (i, entry) in entries.iter().enumerate() {
        if entry.text.contains(&start_marker) {
            start = Some(i);
        }
        if let Some(s) = start {
            if i > s && markers::is_chapter_boundary(&entry.text) {
                end = i;
                break;
            }
        }
    }

    let Some(start) = start else {
        return phases;
    };

    for entry in &entries[start..end] {
        let text = &entry.text;
        if markers::is_chapter_boundary(text) {
            phases.prepare = PhaseStatus::Loading;
        }
        if text.contains("并行检索") && (text.contains("知识库") || text.contains("联网")) {
            phases.prepare = PhaseStatus::Completed;
            phases.initial_search = PhaseStatus::Loading;
        }
        if text.contains("正在评估信息充足性") {
            phases.initial_search = PhaseStatus::Completed;
            phases.reasoning_search = PhaseStatus::Loading;
        }
        if text.contains("正在撰写章节内容") {
            phases.reasoning_search = PhaseStatus::Completed;
            phases.writing = PhaseStatus::Loading;
        }
        if text.contains("章节保存完成") {
            phases.writing = PhaseStatus::Completed;
        }
    }

    phases
}
