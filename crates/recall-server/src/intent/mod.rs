// crates/recall-server/src/intent/mod.rs
// Intent analysis: one LLM call turning a free-text query into a plan

use crate::config::PipelineConfig;
use crate::error::{RecallError, Result};
use crate::llm::{GenerateRequest, LlmClient};
use crate::utils::json::parse_llm_json;
use recall_types::IntentPlan;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// JSON-only analysis prompt; `{query}` is replaced with the user query
/// verbatim
const ANALYSIS_PROMPT: &str = r#"You are the intent analyzer of a context-retrieval engine for an AI coding assistant. Decompose the user query into a retrieval plan.

Respond with ONLY a JSON object, no prose, using exactly this shape:
{
  "core_intent": "query|command|analysis|review|planning|learning",
  "intent_category": "technical|project|business|troubleshooting",
  "key_concepts": ["..."],
  "urgency": "high|medium|low",
  "time_scope": "recent|all|...",
  "timeline_queries": [{"text": "...", "event_types": [], "max_results": 10, "priority": 1}],
  "knowledge_queries": [{"text": "...", "concept_types": [], "relation_types": [], "max_depth": 2, "min_strength": 0.3, "priority": 1}],
  "vector_queries": [{"text": "...", "similarity_threshold": 0.5, "max_results": 10, "priority": 1}],
  "time_recall": {"start_time": "", "end_time": ""}
}

Rules:
- priority is an integer 1-5, 1 highest.
- key_concepts: the concrete technical concepts in the query; backends use
  them as keywords.
- Fill time_recall with "YYYY-MM-DD HH:MM:SS" bounds ONLY when the query asks
  what happened in a specific period; otherwise leave both strings empty.
- Sub-query texts must be self-contained search strings, not instructions.

User query: {query}"#;

/// Single-call intent analyzer. Failures are reported, never recovered here;
/// the orchestrator owns the basic-plan fallback.
pub struct IntentAnalyzer {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    max_tokens: u32,
    temperature: f64,
}

impl IntentAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            timeout: config.llm_timeout,
            max_tokens: config.intent_max_tokens,
            temperature: config.temperature,
        }
    }

    /// Analyze a query into a structured retrieval plan
    pub async fn analyze(&self, query: &str) -> Result<IntentPlan> {
        let prompt = ANALYSIS_PROMPT.replace("{query}", query);
        let request = GenerateRequest::json(prompt, self.max_tokens, self.temperature);

        let result = tokio::time::timeout(self.timeout, self.llm.generate(request))
            .await
            .map_err(|_| RecallError::Plan("intent analysis timed out".into()))?
            .map_err(|e| RecallError::Plan(e.to_string()))?;

        debug!(
            request_id = %result.request_id,
            duration_ms = result.duration_ms,
            "intent analysis response received"
        );

        let plan: IntentPlan =
            parse_llm_json(&result.content).map_err(RecallError::Plan)?;

        info!(
            core_intent = ?plan.core_intent,
            concepts = plan.key_concepts.len(),
            timeline = plan.timeline_queries.len(),
            knowledge = plan.knowledge_queries.len(),
            vector = plan.vector_queries.len(),
            time_recall = plan.wants_time_recall(),
            "intent plan ready"
        );
        Ok(plan)
    }
}
