//! Client-side orchestration for the deep-research report tool.
//!
//! The backend runs the actual multi-stage retrieval/writing pipeline
//! and streams typed workflow events over SSE; this crate opens that
//! stream ([`ResearchRunner`]), folds the events into an append-only
//! log, a per-section timeline and a monotonic progress state
//! ([`WorkflowReducer`]), and derives the per-chapter phase view
//! ([`phases::phase_states`]).

pub mod api;
pub mod log;
pub mod markers;
pub mod phases;
pub mod progress;
pub mod reducer;
pub mod runner;
pub mod timeline;
pub mod types;

pub use api::ReportApi;
pub use log::{LogEntry, WorkflowLog};
pub use phases::{Phase, PhaseStates, PhaseStatus};
pub use progress::ProgressState;
pub use reducer::{RunOutcome, WorkflowReducer, TERMINATED_BY_USER};
pub use runner::{CancelHandle, ResearchRun, ResearchRunner};
pub use timeline::{SectionStep, SectionTimeline, StepStatus};
pub use types::{
    Outline, OutlineSection, ResearchRequest, SectionRef, StepData, SufficiencyEvaluation,
    WorkflowEvent, WorkflowState, WrittenSection,
};
