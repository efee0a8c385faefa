use serde::{Deserialize, Serialize};

use super::outline::{Outline, RetrievalHit, SectionRef, WrittenSection};

/// One frame of the deep-research workflow stream.
///
/// The wire format is a tagged union; every field besides the tag is
/// optional because the backend only populates what a given node knows.
/// Timestamps are server-side milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A workflow node began executing.
    NodeStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<WorkflowState>,
    },

    /// A workflow node finished.
    NodeEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<WorkflowState>,
    },

    /// Incremental state snapshot from a running node.
    StateUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<WorkflowState>,
    },

    /// Human-readable step marker with optional counters and payload.
    StepProgress {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
        /// 1-based step within the emitting node.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<StepData>,
    },

    /// Fatal workflow error; terminates the stream.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Workflow finished; terminates the stream.
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
}

impl WorkflowEvent {
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::NodeStart { task_id, .. }
            | Self::NodeEnd { task_id, .. }
            | Self::StateUpdate { task_id, .. }
            | Self::StepProgress { task_id, .. }
            | Self::Error { task_id, .. }
            | Self::Complete { task_id, .. } => task_id.as_deref(),
        }
    }

    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::NodeStart { timestamp, .. }
            | Self::NodeEnd { timestamp, .. }
            | Self::StateUpdate { timestamp, .. }
            | Self::StepProgress { timestamp, .. }
            | Self::Error { timestamp, .. }
            | Self::Complete { timestamp, .. } => *timestamp,
        }
    }

    /// `complete` and `error` end the stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Free-form state snapshot carried by node events. Only the fields the
/// reducers consume are typed; everything is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_section_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_written_sections: Option<Vec<WrittenSection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_section: Option<SectionRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<RetrievalHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_sections: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_sufficiency_evaluation: Option<SufficiencyEvaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_search_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_temp_kb_results: Option<Vec<RetrievalHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_search_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_search_results: Option<Vec<RetrievalHit>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SufficiencyEvaluation {
    pub sufficient: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_points: Option<Vec<String>>,
}

/// Retrieval payload attached to `step_progress` events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_results: Option<Vec<RetrievalHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_results: Option<Vec<RetrievalHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_sections: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_additional_retrieval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_search_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_retrieval_results: Option<Vec<RetrievalHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_filtered_results: Option<Vec<RetrievalHit>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_step_progress_frame() {
        let json = r#"{"type":"step_progress","node":"prepare_section","step":2,"total":6,"message":"已生成 3 个检索查询","timestamp":1700000000000}"#;
        let event: WorkflowEvent = serde_json::from_str(json).unwrap();
        match event {
            WorkflowEvent::StepProgress {
                node,
                step,
                total,
                message,
                ..
            } => {
                assert_eq!(node.as_deref(), Some("prepare_section"));
                assert_eq!(step, Some(2));
                assert_eq!(total, Some(6));
                assert_eq!(message.as_deref(), Some("已生成 3 个检索查询"));
            }
            other => panic!("expected StepProgress, got {other:?}"),
        }
    }

    #[test]
    fn deserializes_node_end_with_partial_state() {
        let json = r#"{"type":"node_end","node":"save_section","state":{"current_section_index":1,"sections":[{"level1_title":"背景","level2_titles":[]}]}}"#;
        let event: WorkflowEvent = serde_json::from_str(json).unwrap();
        match event {
            WorkflowEvent::NodeEnd { node, state, .. } => {
                assert_eq!(node.as_deref(), Some("save_section"));
                let state = state.unwrap();
                assert_eq!(state.current_section_index, Some(1));
                assert_eq!(state.sections.unwrap().len(), 1);
            }
            other => panic!("expected NodeEnd, got {other:?}"),
        }
    }

    #[test]
    fn terminal_detection() {
        let complete: WorkflowEvent =
            serde_json::from_str(r#"{"type":"complete","task_id":"t1"}"#).unwrap();
        assert!(complete.is_terminal());
        assert_eq!(complete.task_id(), Some("t1"));

        let update: WorkflowEvent = serde_json::from_str(r#"{"type":"state_update"}"#).unwrap();
        assert!(!update.is_terminal());
    }
}
