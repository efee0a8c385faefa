use serde::Serialize;

/// The four loop steps a chapter goes through, keyed by the workflow
/// node that executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStep {
    SelectingHistory,
    CollectingInfo,
    Writing,
    Saving,
}

impl SectionStep {
    pub const ORDER: [SectionStep; 4] = [
        SectionStep::SelectingHistory,
        SectionStep::CollectingInfo,
        SectionStep::Writing,
        SectionStep::Saving,
    ];

    /// Map a workflow node name to its timeline step. `initialize` and
    /// `planning` are not part of the per-section loop.
    pub fn from_node(node: &str) -> Option<Self> {
        match node {
            "prepare_section" => Some(Self::SelectingHistory),
            "collect_info" => Some(Self::CollectingInfo),
            "writing" => Some(Self::Writing),
            "save_section" => Some(Self::Saving),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::SelectingHistory => "准备与初始检索",
            Self::CollectingInfo => "补充检索与评估",
            Self::Writing => "章节写作",
            Self::Saving => "保存章节",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineStep {
    pub step: SectionStep,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-section view of the writing loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionTimeline {
    pub section_index: usize,
    pub title: String,
    pub steps: Vec<TimelineStep>,
}

impl SectionTimeline {
    pub fn new(section_index: usize, title: impl Into<String>) -> Self {
        Self {
            section_index,
            title: title.into(),
            steps: SectionStep::ORDER
                .iter()
                .map(|&step| TimelineStep {
                    step,
                    status: StepStatus::Pending,
                    error: None,
                })
                .collect(),
        }
    }

    pub fn step(&self, step: SectionStep) -> &TimelineStep {
        self.steps.iter().find(|s| s.step == step).expect("all steps present")
    }

    pub fn step_mut(&mut self, step: SectionStep) -> &mut TimelineStep {
        self.steps
            .iter_mut()
            .find(|s| s.step == step)
            .expect("all steps present")
    }

    /// Aggregate status: error > running > completed > pending.
    pub fn status(&self) -> StepStatus {
        if self.steps.iter().any(|s| s.status == StepStatus::Error) {
            StepStatus::Error
        } else if self.steps.iter().any(|s| s.status == StepStatus::Running) {
            StepStatus::Running
        } else if self.steps.iter().all(|s| s.status == StepStatus::Completed) {
            StepStatus::Completed
        } else {
            StepStatus::Pending
        }
    }
}
