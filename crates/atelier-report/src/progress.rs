use serde::Serialize;

use crate::markers::{self, CHAPTER_STEPS};

/// Base allowance granted once initialization finishes.
const BASE_PROGRESS: u32 = 10;

/// Chapter-level progress derived from the workflow stream.
///
/// Invariants:
/// - `overall_progress` never decreases within one run (enforced by
///   [`Self::advance_to`], not assumed from input ordering);
/// - `current_chapter_index` is 0 exactly when no chapter is in flight
///   (before the planning phase ends, or after full completion);
/// - `current_step_in_chapter` stays in 0..=6.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressState {
    pub completed_chapters: usize,
    pub current_chapter_index: usize,
    pub current_step_in_chapter: u32,
    pub overall_progress: u32,
    pub description: String,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            completed_chapters: 0,
            current_chapter_index: 0,
            current_step_in_chapter: 0,
            overall_progress: 0,
            description: "准备开始".to_string(),
        }
    }
}

impl ProgressState {
    /// Observe one appended log line. When it carries a step marker the
    /// sub-step advances and the percentage is recomputed.
    pub fn observe_log_text(&mut self, total_chapters: usize, text: &str) {
        if let Some(step) = markers::detect_step(text) {
            self.current_step_in_chapter = step;
            let target = progress_for(total_chapters, self.completed_chapters, step);
            self.advance_to(target);
        }
    }

    /// A chapter's save phase completed: record the count and reset the
    /// sub-step for the next chapter.
    pub fn chapter_saved(&mut self, completed_chapters: usize, total_chapters: usize) {
        self.completed_chapters = completed_chapters;
        self.current_step_in_chapter = 0;
        self.advance_to(progress_for(total_chapters, completed_chapters, 0));
    }

    /// Raise the percentage, never lowering it.
    pub fn advance_to(&mut self, value: u32) {
        self.overall_progress = self.overall_progress.max(value.min(100));
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }
}

/// Percentage for a given chapter position.
///
/// 10% initialization allowance plus 90% split evenly across the
/// chapters; within a chapter the share is split into 6 equal
/// sub-steps. A zero-chapter outline is treated as one chapter.
pub fn progress_for(total_chapters: usize, completed_chapters: usize, current_step: u32) -> u32 {
    let total = total_chapters.max(1);
    let per_chapter = 90.0 / total as f64;
    let per_step = per_chapter / CHAPTER_STEPS as f64;

    let mut progress = BASE_PROGRESS as f64 + completed_chapters as f64 * per_chapter;
    if current_step > 0 && completed_chapters < total {
        progress += current_step as f64 * per_step;
    }

    (progress.round() as u32).clamp(BASE_PROGRESS, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_and_full_range() {
        assert_eq!(progress_for(2, 0, 0), 10);
        assert_eq!(progress_for(2, 2, 0), 100);
    }

    #[test]
    fn two_chapter_outline_first_chapter_steps() {
        // 45% per chapter, 7.5% per step.
        assert_eq!(progress_for(2, 0, 1), 18); // 10 + 7.5 rounded
        assert_eq!(progress_for(2, 0, 2), 25);
        assert_eq!(progress_for(2, 0, 6), 55);
        assert_eq!(progress_for(2, 1, 0), 55);
        assert_eq!(progress_for(2, 1, 6), 100);
    }

    #[test]
    fn zero_chapters_clamps_to_one() {
        assert_eq!(progress_for(0, 0, 0), 10);
        assert_eq!(progress_for(0, 0, 3), 55);
        assert_eq!(progress_for(0, 1, 0), 100);
    }

    #[test]
    fn step_after_final_chapter_adds_nothing() {
        // completed == total: the step term is dropped instead of
        // pushing past 100.
        assert_eq!(progress_for(2, 2, 3), 100);
    }

    #[test]
    fn observe_is_monotonic() {
        let mut state = ProgressState::default();
        state.advance_to(10);
        state.observe_log_text(2, "✅ 并行检索完成，共 10 条结果");
        let after_step2 = state.overall_progress;
        assert_eq!(after_step2, 25);

        // A repeated lower-step marker must not lower the percentage.
        state.observe_log_text(2, "已生成 3 个检索查询");
        assert_eq!(state.overall_progress, after_step2);
        assert_eq!(state.current_step_in_chapter, 1);
    }
}
