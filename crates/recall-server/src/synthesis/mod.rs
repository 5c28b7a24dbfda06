// crates/recall-server/src/synthesis/mod.rs
// Context synthesis: the second LLM call. Evaluates whether the stored
// session context should change and produces the merged context.

use crate::config::PipelineConfig;
use crate::error::{RecallError, Result};
use crate::llm::{GenerateRequest, LlmClient};
use crate::utils::clamp_score;
use crate::utils::json::parse_llm_json;
use chrono::Utc;
use recall_types::{
    CodeActivity, ContextRequest, ProjectProfile, RetrievalResults, SynthesisEvaluation,
    TopicContext, UnifiedContext,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Only the strongest hits per dimension make it into the prompt
const TOP_RESULTS_PER_DIMENSION: usize = 5;

const SYNTHESIS_PROMPT: &str = r#"You are the context synthesizer of a retrieval engine for an AI coding assistant. Given the user query, the current session context (may be null), and fresh retrieval results from three backends, decide whether the session context should be updated and produce the merged context.

Respond with ONLY a JSON object of this shape:
{
  "evaluation_result": {
    "should_update": true,
    "update_confidence": 0.0,
    "evaluation_reason": "...",
    "semantic_changes": [
      {"dimension": "topic|project|code|conversation",
       "change_type": "shift|expand|refine|contradict",
       "description": "...", "evidence": ["..."]}
    ]
  },
  "synthesized_context": {
    "current_topic": {"main_topic": "...", "category": "...", "user_intent": "...",
      "primary_pain_point": "...", "expected_outcome": "...",
      "key_concepts": [{"name": "...", "type": "...", "definition": "...", "importance": 0.0}],
      "confidence_level": 0.0},
    "project": {"name": "...", "type": "...", "description": "...",
      "primary_language": "...", "current_phase": "...", "confidence_level": 0.0},
    "code": {"active_files": [], "recent_edits": [], "focused_components": [],
      "key_functions": [], "important_types": []},
    "recent_changes_summary": "...",
    "conversation": "..."
  }
}

Rules:
- should_update is true only when the retrieval results genuinely change the
  picture of what the session is about.
- All confidence and importance values lie in [0,1].
- Do not invent identifiers; session ownership is set by the caller.

User query: {query}

Current context:
{current}

Retrieval results:
{results}"#;

/// What a synthesis produced. Either half may be missing; the session
/// manager owns the downgrade behavior.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOutcome {
    pub evaluation: Option<SynthesisEvaluation>,
    pub context: Option<UnifiedContext>,
}

/// Model-shaped context payload: no identifiers, no timestamps. Those are
/// never trusted from the model and get stamped during materialization.
#[derive(Debug, Clone, Default, Deserialize)]
struct ContextDraft {
    #[serde(default)]
    current_topic: TopicContext,
    #[serde(default)]
    project: ProjectProfile,
    #[serde(default)]
    code: CodeActivity,
    #[serde(default)]
    recent_changes_summary: String,
    #[serde(default)]
    conversation: String,
}

#[derive(Debug, Deserialize)]
struct WireSynthesis {
    #[serde(default)]
    evaluation_result: Option<SynthesisEvaluation>,
    #[serde(default)]
    synthesized_context: Option<ContextDraft>,
}

pub struct ContextSynthesizer {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    max_tokens: u32,
    temperature: f64,
}

impl ContextSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            timeout: config.llm_timeout,
            max_tokens: config.synthesis_max_tokens,
            temperature: config.temperature,
        }
    }

    /// Run the synthesis call. Transport and parse failures are errors the
    /// caller maps onto the no-mutation path; a parsed response with null
    /// halves comes back as an outcome with `None` fields.
    pub async fn synthesize(
        &self,
        request: &ContextRequest,
        current: Option<&UnifiedContext>,
        results: &RetrievalResults,
    ) -> Result<SynthesisOutcome> {
        let prompt = self.build_prompt(&request.query, current, results)?;
        let generate = GenerateRequest::json(prompt, self.max_tokens, self.temperature);

        let result = tokio::time::timeout(self.timeout, self.llm.generate(generate))
            .await
            .map_err(|_| RecallError::Synthesis("synthesis timed out".into()))?
            .map_err(|e| RecallError::Synthesis(e.to_string()))?;

        debug!(
            request_id = %result.request_id,
            duration_ms = result.duration_ms,
            "synthesis response received"
        );

        let wire: WireSynthesis =
            parse_llm_json(&result.content).map_err(RecallError::Synthesis)?;

        let evaluation = wire.evaluation_result.map(|mut eval| {
            eval.update_confidence = clamp_score(eval.update_confidence);
            eval
        });
        let context = wire
            .synthesized_context
            .map(|draft| materialize(draft, request, current));

        info!(
            session_id = %request.session_id,
            has_evaluation = evaluation.is_some(),
            has_context = context.is_some(),
            "synthesis outcome ready"
        );
        Ok(SynthesisOutcome {
            evaluation,
            context,
        })
    }

    fn build_prompt(
        &self,
        query: &str,
        current: Option<&UnifiedContext>,
        results: &RetrievalResults,
    ) -> Result<String> {
        let current_json = match current {
            Some(ctx) => serde_json::to_string_pretty(ctx)?,
            None => "null".to_string(),
        };

        let mut trimmed = results.clone();
        trimmed.timeline.items.truncate(TOP_RESULTS_PER_DIMENSION);
        trimmed.knowledge.items.truncate(TOP_RESULTS_PER_DIMENSION);
        trimmed.vector.items.truncate(TOP_RESULTS_PER_DIMENSION);
        let results_json = serde_json::to_string_pretty(&trimmed)?;

        Ok(SYNTHESIS_PROMPT
            .replace("{query}", query)
            .replace("{current}", &current_json)
            .replace("{results}", &results_json))
    }
}

/// Turn a model draft into a full context record owned by the request
fn materialize(
    draft: ContextDraft,
    request: &ContextRequest,
    current: Option<&UnifiedContext>,
) -> UnifiedContext {
    let now = Utc::now();
    let mut topic = draft.current_topic;
    topic.confidence_level = clamp_score(topic.confidence_level);
    for concept in &mut topic.key_concepts {
        concept.importance = clamp_score(concept.importance);
    }
    topic.update_count = current
        .map(|c| c.current_topic.update_count + 1)
        .unwrap_or(1);
    topic.last_updated = Some(now);

    let mut project = draft.project;
    project.confidence_level = clamp_score(project.confidence_level);

    UnifiedContext {
        session_id: request.session_id.clone(),
        user_id: request.user_id.clone(),
        workspace_id: request.workspace_id(),
        current_topic: topic,
        project,
        code: draft.code,
        recent_changes_summary: draft.recent_changes_summary,
        conversation: draft.conversation,
        created_at: current.map(|c| c.created_at).unwrap_or(now),
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerateResult, Provider};
    use async_trait::async_trait;
    use recall_types::{DimensionResult, DimensionStatus};
    use std::sync::Mutex;

    struct ScriptedLlm {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_string(),
                prompts: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResult> {
            self.prompts.lock().unwrap().push(request.prompt);
            Ok(GenerateResult {
                request_id: "req-1".into(),
                content: self.response.clone(),
                usage: None,
                duration_ms: 3,
            })
        }
        fn provider_type(&self) -> Provider {
            Provider::DeepSeek
        }
        fn model_name(&self) -> String {
            "scripted".into()
        }
    }

    fn empty_results() -> RetrievalResults {
        RetrievalResults {
            timeline: DimensionResult {
                items: vec![],
                status: DimensionStatus::Failure,
                duration_ms: 0,
                error: None,
            },
            knowledge: DimensionResult {
                items: vec![],
                status: DimensionStatus::Failure,
                duration_ms: 0,
                error: None,
            },
            vector: DimensionResult {
                items: vec![],
                status: DimensionStatus::Failure,
                duration_ms: 0,
                error: None,
            },
            overall_quality: 0.0,
            total_duration_ms: 0,
        }
    }

    fn request() -> ContextRequest {
        ContextRequest::new("u-1", "/tmp/ws", "s-1", "tune the cache")
    }

    const FULL_RESPONSE: &str = r#"{
        "evaluation_result": {
            "should_update": true,
            "update_confidence": 0.82,
            "evaluation_reason": "new topic",
            "semantic_changes": []
        },
        "synthesized_context": {
            "current_topic": {"main_topic": "cache tuning", "confidence_level": 0.9},
            "project": {"name": "acme", "confidence_level": 1.4},
            "recent_changes_summary": "raised LRU capacity"
        }
    }"#;

    #[tokio::test]
    async fn test_synthesize_parses_both_halves() {
        let llm = ScriptedLlm::new(FULL_RESPONSE);
        let synthesizer = ContextSynthesizer::new(llm, &PipelineConfig::default());
        let outcome = synthesizer
            .synthesize(&request(), None, &empty_results())
            .await
            .unwrap();

        let eval = outcome.evaluation.unwrap();
        assert!(eval.should_update);
        assert_eq!(eval.update_confidence, 0.82);

        let ctx = outcome.context.unwrap();
        assert_eq!(ctx.current_topic.main_topic, "cache tuning");
        assert_eq!(ctx.session_id, "s-1");
        assert_eq!(ctx.user_id, "u-1");
        assert_eq!(ctx.workspace_id, "ws");
        // Out-of-range model scores are clamped
        assert_eq!(ctx.project.confidence_level, 1.0);
    }

    #[tokio::test]
    async fn test_null_evaluation_is_none_not_error() {
        let llm = ScriptedLlm::new(
            r#"{"evaluation_result": null, "synthesized_context": null}"#,
        );
        let synthesizer = ContextSynthesizer::new(llm, &PipelineConfig::default());
        let outcome = synthesizer
            .synthesize(&request(), None, &empty_results())
            .await
            .unwrap();
        assert!(outcome.evaluation.is_none());
        assert!(outcome.context.is_none());
    }

    #[tokio::test]
    async fn test_unparseable_response_is_synthesis_error() {
        let llm = ScriptedLlm::new("the context looks fine to me");
        let synthesizer = ContextSynthesizer::new(llm, &PipelineConfig::default());
        let err = synthesizer
            .synthesize(&request(), None, &empty_results())
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::Synthesis(_)));
    }

    #[tokio::test]
    async fn test_prompt_contains_query_and_null_context() {
        let llm = ScriptedLlm::new(FULL_RESPONSE);
        let synthesizer = ContextSynthesizer::new(llm.clone(), &PipelineConfig::default());
        synthesizer
            .synthesize(&request(), None, &empty_results())
            .await
            .unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("tune the cache"));
        assert!(prompts[0].contains("Current context:\nnull"));
    }

    #[tokio::test]
    async fn test_materialize_preserves_created_at_and_counts_updates() {
        let llm = ScriptedLlm::new(FULL_RESPONSE);
        let synthesizer = ContextSynthesizer::new(llm, &PipelineConfig::default());

        let mut previous = UnifiedContext::new("s-1", "u-1", "ws");
        previous.current_topic.update_count = 4;
        let created = previous.created_at;

        let outcome = synthesizer
            .synthesize(&request(), Some(&previous), &empty_results())
            .await
            .unwrap();
        let ctx = outcome.context.unwrap();
        assert_eq!(ctx.created_at, created);
        assert_eq!(ctx.current_topic.update_count, 5);
        assert!(ctx.updated_at >= ctx.created_at);
    }
}
