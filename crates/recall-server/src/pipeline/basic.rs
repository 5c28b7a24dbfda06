// crates/recall-server/src/pipeline/basic.rs
// Basic context service: answers without any model call

use super::format_session_state;
use crate::session::SessionContextManager;
use recall_types::{ContextRequest, ContextResponse};
use std::sync::Arc;

const EMPTY_FIELD: &str = "暂无";

/// Non-LLM fallback. Serves the stored session context when one exists and
/// the downgrade context otherwise; memory fields stay empty.
pub struct BasicContextService {
    sessions: Arc<SessionContextManager>,
}

impl BasicContextService {
    pub fn new(sessions: Arc<SessionContextManager>) -> Self {
        Self { sessions }
    }

    pub async fn respond(&self, request: &ContextRequest) -> ContextResponse {
        let context = self.sessions.get_or_create_basic(request).await;
        ContextResponse {
            session_state: format_session_state(&context, context.current_topic.confidence_level),
            short_term_memory: EMPTY_FIELD.to_string(),
            long_term_memory: EMPTY_FIELD.to_string(),
            relevant_knowledge: EMPTY_FIELD.to_string(),
        }
    }
}
