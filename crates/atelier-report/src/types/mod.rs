pub mod events;
pub mod outline;

pub use events::{StepData, SufficiencyEvaluation, WorkflowEvent, WorkflowState};
pub use outline::{
    Citation, Outline, OutlineSection, ResearchRequest, RetrievalHit, SectionRef, WrittenSection,
};
