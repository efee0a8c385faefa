use std::collections::BTreeMap;

use crate::log::WorkflowLog;
use crate::markers;
use crate::phases::{self, PhaseStates};
use crate::progress::ProgressState;
use crate::timeline::{SectionStep, SectionTimeline, StepStatus};
use crate::types::{SectionRef, WorkflowEvent, WorkflowState};

/// Message recorded on running steps when the user terminates a run.
pub const TERMINATED_BY_USER: &str = "用户已终止任务";

/// Terminal disposition of one workflow run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Running,
    Completed,
    Failed { message: String },
    /// User cancellation; distinct from failure.
    Cancelled,
}

/// Folds the ordered workflow event sequence into the append-only log,
/// the per-section timeline, and the chapter progress state.
///
/// The reducer consumes only what events carry (including their server
/// timestamps) and never reads the clock, so replaying the same
/// sequence into a fresh instance reproduces the same final state.
#[derive(Debug, Default)]
pub struct WorkflowReducer {
    log: WorkflowLog,
    progress: ProgressState,
    timelines: BTreeMap<usize, SectionTimeline>,
    sections: Vec<SectionRef>,
    estimated_words: Option<u64>,
    task_id: Option<String>,
    last_node_end: Option<i64>,
    outcome: Option<RunOutcome>,
}

impl WorkflowReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &WorkflowLog {
        &self.log
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome.clone().unwrap_or(RunOutcome::Running)
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn sections(&self) -> &[SectionRef] {
        &self.sections
    }

    pub fn estimated_words(&self) -> Option<u64> {
        self.estimated_words
    }

    pub fn timelines(&self) -> impl Iterator<Item = &SectionTimeline> {
        self.timelines.values()
    }

    /// Phase states for an explicit chapter (1-based).
    pub fn phase_states(&self, chapter_index: usize) -> PhaseStates {
        phases::phase_states(&self.log, chapter_index)
    }

    /// Phase states for the chapter currently in flight.
    pub fn current_phases(&self) -> PhaseStates {
        self.phase_states(self.progress.current_chapter_index)
    }

    /// Fold one event. Events arriving after a terminal disposition are
    /// ignored; the run is frozen.
    pub fn apply(&mut self, event: &WorkflowEvent) {
        if self.outcome.is_some() {
            return;
        }

        if let Some(task_id) = event.task_id() {
            self.task_id = Some(task_id.to_string());
        }

        match event {
            WorkflowEvent::NodeStart {
                node: Some(node),
                state,
                ..
            } => {
                self.absorb_state(state.as_ref());
                self.start_step(node, state.as_ref());
            }
            WorkflowEvent::StateUpdate { state, .. } => {
                self.absorb_state(state.as_ref());
            }
            WorkflowEvent::StepProgress {
                node,
                step,
                total,
                message,
                timestamp,
                ..
            } => {
                if step.is_some() && total.is_some() {
                    if let Some(message) = message {
                        let tag = node.as_deref().unwrap_or("system").to_string();
                        self.add_log(tag, message.clone(), *timestamp);
                    }
                }
            }
            WorkflowEvent::NodeEnd {
                node: Some(node),
                state,
                timestamp,
                ..
            } => {
                self.absorb_state(state.as_ref());
                let node = node.clone();
                let state = state.clone().unwrap_or_default();
                self.on_node_end(&node, &state, *timestamp);
                self.complete_step(&node, Some(&state));
            }
            WorkflowEvent::Complete { timestamp, .. } => {
                self.on_complete(*timestamp);
            }
            WorkflowEvent::Error { error, .. } => {
                let message = error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string());
                self.mark_running_steps(&message);
                self.outcome = Some(RunOutcome::Failed { message });
            }
            // node_start / node_end without a node name carry nothing to fold.
            _ => {}
        }
    }

    /// Terminate the run from the caller's side. Running timeline steps
    /// become errors with a fixed message; progress is left untouched.
    pub fn terminate(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        self.mark_running_steps(TERMINATED_BY_USER);
        self.outcome = Some(RunOutcome::Cancelled);
    }

    fn absorb_state(&mut self, state: Option<&WorkflowState>) {
        let Some(state) = state else { return };
        if let Some(sections) = &state.sections {
            if !sections.is_empty() {
                self.sections = sections.clone();
            }
        }
        if let Some(outline) = &state.outline {
            if outline.estimated_words > 0 {
                self.estimated_words = Some(outline.estimated_words);
            }
            if self.sections.is_empty() && !outline.sections.is_empty() {
                self.sections = outline
                    .sections
                    .iter()
                    .map(|s| SectionRef {
                        level1_title: s.level1_title.clone(),
                        level2_titles: s.level2_titles.clone(),
                        index: None,
                        section_id: None,
                    })
                    .collect();
            }
        }
        if let Some(task_id) = &state.task_id {
            self.task_id = Some(task_id.clone());
        }
    }

    fn total_sections(&self) -> usize {
        self.sections.len()
    }

    fn add_log(&mut self, tag: impl Into<String>, text: impl Into<String>, timestamp: Option<i64>) {
        let text = text.into();
        self.progress
            .observe_log_text(self.total_sections(), &text);
        self.log.push(tag, text, timestamp);
    }

    fn start_step(&mut self, node: &str, state: Option<&WorkflowState>) {
        let Some(step) = SectionStep::from_node(node) else {
            return;
        };
        let index = state
            .and_then(|s| s.current_section_index)
            .unwrap_or(0);
        let title = state
            .and_then(|s| s.current_section.as_ref())
            .map(|s| s.level1_title.clone())
            .or_else(|| self.sections.get(index).map(|s| s.level1_title.clone()))
            .unwrap_or_else(|| format!("章节 {}", index + 1));
        let timeline = self
            .timelines
            .entry(index)
            .or_insert_with(|| SectionTimeline::new(index, title));
        let entry = timeline.step_mut(step);
        entry.status = StepStatus::Running;
        entry.error = None;
    }

    fn complete_step(&mut self, node: &str, state: Option<&WorkflowState>) {
        let Some(step) = SectionStep::from_node(node) else {
            return;
        };
        // Prefer the hinted section; save_section's end state already
        // carries the incremented index, so fall back to the most
        // recent section whose step is still running.
        if let Some(index) = state.and_then(|s| s.current_section_index) {
            if let Some(timeline) = self.timelines.get_mut(&index) {
                if timeline.step(step).status == StepStatus::Running {
                    timeline.step_mut(step).status = StepStatus::Completed;
                    return;
                }
            }
        }
        if let Some(timeline) = self
            .timelines
            .values_mut()
            .rev()
            .find(|t| t.step(step).status == StepStatus::Running)
        {
            timeline.step_mut(step).status = StepStatus::Completed;
        }
    }

    fn mark_running_steps(&mut self, message: &str) {
        for timeline in self.timelines.values_mut() {
            for entry in &mut timeline.steps {
                if entry.status == StepStatus::Running {
                    entry.status = StepStatus::Error;
                    entry.error = Some(message.to_string());
                }
            }
        }
    }

    /// Seconds between this node end and the previous one, from server
    /// timestamps. The first timestamped end only sets the baseline.
    fn take_duration(&mut self, timestamp: Option<i64>) -> Option<f64> {
        let current = timestamp?;
        let previous = self.last_node_end.replace(current);
        previous.map(|p| (current - p).max(0) as f64 / 1000.0)
    }

    fn on_node_end(&mut self, node: &str, state: &WorkflowState, timestamp: Option<i64>) {
        let duration = self.take_duration(timestamp);

        match node {
            "initialize" => {
                self.add_log(node, "⚙️ 工作流初始化完成", timestamp);
                self.progress.advance_to(10);
                self.progress.set_description("准备开始撰写...");
            }
            "planning" => {
                self.add_log(node, "✅ 大纲校验通过", timestamp);
                self.add_log("system", "📚 正在准备第一章节资料...", timestamp);
                self.add_log("system", "💡 预计耗时 10-30 秒，请稍候...", timestamp);
                self.progress.current_chapter_index = 1;
                self.progress.current_step_in_chapter = 0;
                self.progress.set_description("准备第一章节资料...");
            }
            "prepare_section" => {
                let retrieved = state
                    .initial_temp_kb_results
                    .as_ref()
                    .map_or(0, |r| r.len());
                self.add_log(node, format!("✅ 已检索 {} 条资料", retrieved), timestamp);

                let duration_text = match duration {
                    Some(d) if d > 10.0 => format!(" (总耗时 {:.1}秒 ⏱️)", d),
                    Some(d) => format!(" (总耗时 {:.1}秒)", d),
                    None => String::new(),
                };
                let history = state.history_sections.clone().unwrap_or_default();
                if history.is_empty() {
                    self.add_log(node, format!("✅ 无需回顾历史章节{}", duration_text), timestamp);
                } else {
                    let titles = history
                        .iter()
                        .map(|t| format!("「{}」", t))
                        .collect::<Vec<_>>()
                        .join("、");
                    self.add_log(
                        node,
                        format!("✅ 已回顾 {} 章节{}", titles, duration_text),
                        timestamp,
                    );
                }

                self.add_log("collect_info", "🤔 正在评估信息充足性...", timestamp);
                self.progress.set_description("评估信息充足性...");
            }
            "collect_info" => {
                let additional = state
                    .additional_search_results
                    .as_ref()
                    .map_or(0, |r| r.len());
                let sufficient = state
                    .info_sufficiency_evaluation
                    .as_ref()
                    .map(|e| e.sufficient)
                    .unwrap_or(false);
                let duration_text = duration
                    .map(|d| format!(" (总耗时 {:.1}秒)", d))
                    .unwrap_or_default();

                if sufficient {
                    self.add_log(node, format!("✅ 信息充足{}", duration_text), timestamp);
                } else if additional > 0 {
                    self.add_log(
                        node,
                        format!("⚠️ 信息不足，已补充检索 {} 条{}", additional, duration_text),
                        timestamp,
                    );
                } else {
                    self.add_log(
                        node,
                        format!("⚠️ 信息不足，继续撰写{}", duration_text),
                        timestamp,
                    );
                }

                self.add_log(node, "✍️ 正在撰写章节内容...", timestamp);
                self.progress.set_description("撰写章节内容...");
            }
            "writing" => {
                let content_length = state
                    .written_content
                    .as_ref()
                    .map_or(0, |c| c.chars().count());
                match duration {
                    Some(d) => self.add_log(
                        node,
                        format!("✅ 已生成 {} 字符 (耗时 {:.1}秒)", content_length, d),
                        timestamp,
                    ),
                    None => self.add_log(
                        node,
                        format!("✅ 已生成 {} 字符", content_length),
                        timestamp,
                    ),
                }
                self.progress.set_description("保存章节...");
            }
            "save_section" => {
                self.add_log(node, "✅ 章节保存完成", timestamp);

                // The node increments the index before it ends, so the
                // state's index IS the completed-chapter count.
                let completed = state.current_section_index.unwrap_or(0);
                let total = state
                    .sections
                    .as_ref()
                    .map(|s| s.len())
                    .filter(|&n| n > 0)
                    .unwrap_or_else(|| self.total_sections());
                self.progress.chapter_saved(completed, total);

                if completed < total {
                    let next = completed + 1;
                    self.add_log(
                        "system",
                        format!("📚 正在准备{}章节资料...", markers::chapter_label(next)),
                        timestamp,
                    );
                    self.add_log("system", "💡 预计耗时 10-30 秒，请稍候...", timestamp);
                    self.progress.current_chapter_index = next;
                    let title = self
                        .sections
                        .get(next - 1)
                        .map(|s| s.level1_title.clone())
                        .unwrap_or_else(|| format!("第{}章", next));
                    self.progress.set_description(format!("准备资料：{}", title));
                } else {
                    self.add_log("system", "🎉 所有章节撰写完成！", timestamp);
                    self.add_log("system", "正在进行最终汇总...", timestamp);
                    self.progress.current_chapter_index = 0;
                    self.progress.advance_to(100);
                    self.progress.set_description("已完成");
                }
            }
            _ => {}
        }
    }

    fn on_complete(&mut self, timestamp: Option<i64>) {
        let total = self.total_sections();
        self.progress.chapter_saved(total, total);
        self.progress.current_chapter_index = 0;
        self.progress.advance_to(100);
        self.progress.set_description("已完成");

        let already_logged = self
            .log
            .last()
            .map_or(false, |e| e.text.contains("所有章节撰写完成"));
        if !already_logged {
            self.add_log("system", "🎉 所有章节撰写完成！", timestamp);
        }

        self.outcome = Some(RunOutcome::Completed);
    }
}
