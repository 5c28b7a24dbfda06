// crates/recall-server/src/pipeline/mod.rs
// End-to-end retrieval orchestration: fast paths, wide recall, synthesis,
// fallback. The public entry point of the engine.

mod basic;
mod metrics;

pub use basic::BasicContextService;
pub use metrics::{MetricsSnapshot, PipelineMetrics};

use crate::config::{DrivenFlags, EnvConfig, PipelineConfig};
use crate::engines::{KnowledgeAdapter, SearchContext, TimelineAdapter, VectorAdapter};
use crate::error::{RecallError, Result};
use crate::intent::IntentAnalyzer;
use crate::llm::{LlmClient, ProviderFactory};
use crate::programming::{ProgrammingContextExtractor, render};
use crate::retrieval::{ParallelRetriever, QueryKind, RetrievalConfig, enrich_query};
use crate::session::{ContextDecision, SessionContextManager};
use crate::synthesis::{ContextSynthesizer, SynthesisOutcome};
use chrono::{DateTime, NaiveDateTime, Utc};
use recall_types::{
    ContextRequest, ContextResponse, DimensionStatus, IntentPlan, RetrievalResults,
    SessionSnapshot, TimeRecall, TimeRecallEvent, TimelineQuery, UnifiedContext,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use tracing::{info, warn};

const EMPTY_FIELD: &str = "暂无";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The wide-recall / narrow-synthesize pipeline.
///
/// One instance serves all sessions. Construction wires the two model
/// calls, the three adapters, and the session manager together; nothing in
/// here is a hidden singleton.
pub struct ContextPipeline {
    analyzer: IntentAnalyzer,
    retriever: ParallelRetriever,
    synthesizer: ContextSynthesizer,
    sessions: Arc<SessionContextManager>,
    basic: BasicContextService,
    timeline: Arc<TimelineAdapter>,
    flags: DrivenFlags,
    config: PipelineConfig,
    metrics: PipelineMetrics,
    /// Consecutive synthesis failures; at the configured threshold the
    /// pipeline stops burning model calls and serves the basic service
    consecutive_failures: AtomicU32,
}

impl ContextPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        timeline: Arc<TimelineAdapter>,
        knowledge: Arc<KnowledgeAdapter>,
        vector: Arc<VectorAdapter>,
        sessions: Arc<SessionContextManager>,
        flags: DrivenFlags,
        config: PipelineConfig,
    ) -> Self {
        let analyzer = IntentAnalyzer::new(llm.clone(), &config);
        let synthesizer = ContextSynthesizer::new(llm, &config);
        let retriever = ParallelRetriever::new(
            Arc::clone(&timeline),
            knowledge,
            vector,
            RetrievalConfig {
                backend_timeout: config.backend_timeout,
                cjk_enrichment: config.cjk_enrichment,
            },
        );
        Self {
            analyzer,
            retriever,
            synthesizer,
            basic: BasicContextService::new(Arc::clone(&sessions)),
            sessions,
            timeline,
            flags,
            config,
            metrics: PipelineMetrics::new(),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Wire the pipeline from environment configuration: provider factory,
    /// driven flags, and per-call overrides all come from `env`.
    pub fn from_env_config(
        env: &EnvConfig,
        timeline: Arc<TimelineAdapter>,
        knowledge: Arc<KnowledgeAdapter>,
        vector: Arc<VectorAdapter>,
        sessions: Arc<SessionContextManager>,
    ) -> Result<Self> {
        let factory = ProviderFactory::new(&env.api_keys, &env.llm);
        let llm = factory
            .primary()
            .ok_or_else(|| RecallError::Config("no LLM provider available".into()))?;
        let config = PipelineConfig::default().with_llm_settings(&env.llm);
        Ok(Self::new(
            llm,
            timeline,
            knowledge,
            vector,
            sessions,
            env.driven.clone(),
            config,
        ))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Retrieve the synthesized context block for one query.
    ///
    /// Only `InvalidInput` and `Fatal` ever surface; every other failure is
    /// recovered into a degraded but well-formed response.
    pub async fn retrieve(
        &self,
        request: &ContextRequest,
        snapshot: Option<&SessionSnapshot>,
    ) -> Result<ContextResponse> {
        let started = Instant::now();
        self.metrics.record_request();

        // Identity is required before anything else runs; time-recall in
        // particular must fail here without a single model call.
        if request.user_id.trim().is_empty() {
            self.metrics.record_error();
            return Err(RecallError::InvalidInput("missing user_id".into()));
        }
        if request.session_id.trim().is_empty() {
            self.metrics.record_error();
            return Err(RecallError::InvalidInput("missing session_id".into()));
        }

        if !self.flags.enabled {
            self.metrics.record_fallback();
            return Ok(self.basic.respond(request).await);
        }
        if self.flags.auto_fallback
            && self.consecutive_failures.load(Ordering::Relaxed) >= self.flags.fallback_threshold
        {
            warn!(
                session_id = %request.session_id,
                failures = self.consecutive_failures.load(Ordering::Relaxed),
                "synthesis failure threshold reached, serving basic service"
            );
            self.metrics.record_fallback();
            return Ok(self.basic.respond(request).await);
        }
        self.metrics.record_driven();

        // Semantic analysis off means no analyzer call at all
        let mut plan = if self.flags.semantic_analysis {
            match self.analyzer.analyze(&request.query).await {
                Ok(plan) => plan,
                Err(e) => {
                    warn!(
                        session_id = %request.session_id,
                        latency_ms = started.elapsed().as_millis() as u64,
                        cause = %e,
                        "intent analysis failed, using basic plan"
                    );
                    IntentPlan::basic(&request.query)
                }
            }
        } else {
            IntentPlan::basic(&request.query)
        };

        if plan.wants_time_recall() {
            let time_recall = plan.time_recall.take().unwrap_or_default();
            let response = self.time_recall(request, &time_recall).await;
            match &response {
                Ok(_) => self
                    .metrics
                    .record_driven_success(started.elapsed().as_millis() as u64),
                Err(_) => self.metrics.record_error(),
            }
            return response;
        }

        fold_concepts_into_vector_queries(&mut plan);
        // Single-dimension mode keeps only the vector backend
        if !self.flags.multi_dimensional {
            plan.timeline_queries.clear();
            plan.knowledge_queries.clear();
        }
        let ctx = SearchContext {
            user_id: request.user_id.clone(),
            workspace_id: request.workspace_id(),
            key_concepts: plan.key_concepts.clone(),
            time_recall: false,
        };
        let results = self.retriever.retrieve(&plan, &ctx).await;

        let all_failed = results.timeline.status == DimensionStatus::Failure
            && results.knowledge.status == DimensionStatus::Failure
            && results.vector.status == DimensionStatus::Failure
            && results.timeline.error.is_some()
            && results.knowledge.error.is_some()
            && results.vector.error.is_some();
        if all_failed && !self.flags.auto_fallback {
            self.metrics.record_error();
            return Err(RecallError::Fatal(
                "all retrieval dimensions failed and auto-fallback is disabled".into(),
            ));
        }

        // Empty or failed recall still goes through synthesis: the
        // evaluation decides, and first contact gets the basic context.
        // Content synthesis off serves the stored (or basic) context.
        let current = self.sessions.get(&request.session_id).await;
        let outcome = if !self.flags.content_synthesis {
            SynthesisOutcome::default()
        } else {
            match self
                .synthesizer
                .synthesize(request, current.as_ref(), &results)
                .await
            {
                Ok(outcome) => {
                    self.consecutive_failures.store(0, Ordering::Relaxed);
                    outcome
                }
                Err(e) => {
                    warn!(
                        session_id = %request.session_id,
                        latency_ms = started.elapsed().as_millis() as u64,
                        cause = %e,
                        "synthesis failed, downgrading"
                    );
                    self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                    self.metrics.record_fallback();
                    SynthesisOutcome::default()
                }
            }
        };
        let decision = self.sessions.apply(request, outcome).await;

        let response = self
            .build_response(request, snapshot, &results, &decision)
            .await;

        info!(
            session_id = %request.session_id,
            quality = results.overall_quality,
            updated = decision.updated,
            latency_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        self.metrics
            .record_driven_success(started.elapsed().as_millis() as u64);
        Ok(response)
    }

    /// Time-recall fast path: a pure timeline window query, no synthesis
    async fn time_recall(
        &self,
        request: &ContextRequest,
        recall: &TimeRecall,
    ) -> Result<ContextResponse> {
        if request.workspace_path.trim().is_empty() {
            return Err(RecallError::InvalidInput(
                "missing workspace_path on time-recall".into(),
            ));
        }
        let start = parse_recall_time(&recall.start_time)?;
        let end = parse_recall_time(&recall.end_time)?;
        if start > end {
            return Err(RecallError::InvalidInput(format!(
                "time-recall start {} is after end {}",
                recall.start_time, recall.end_time
            )));
        }

        let events = self
            .timeline
            .search_window(
                &request.user_id,
                &request.workspace_id(),
                start,
                end,
                self.config.time_recall_limit,
            )
            .await?;
        let projected: Vec<TimeRecallEvent> = events.iter().map(TimeRecallEvent::from).collect();

        info!(
            session_id = %request.session_id,
            events = projected.len(),
            "time-recall fast path served"
        );
        Ok(ContextResponse {
            session_state: EMPTY_FIELD.to_string(),
            short_term_memory: EMPTY_FIELD.to_string(),
            long_term_memory: serde_json::to_string_pretty(&projected)?,
            relevant_knowledge: EMPTY_FIELD.to_string(),
        })
    }

    async fn build_response(
        &self,
        request: &ContextRequest,
        snapshot: Option<&SessionSnapshot>,
        results: &RetrievalResults,
        decision: &ContextDecision,
    ) -> ContextResponse {
        let session_state = format_session_state(&decision.context, decision.confidence);

        let short_term_memory = if self.flags.short_term_memory {
            self.recent_activity(request).await
        } else {
            EMPTY_FIELD.to_string()
        };

        let long_term_memory = format_long_term(results);

        let relevant_knowledge = match snapshot {
            Some(snapshot) => {
                let programming =
                    ProgrammingContextExtractor::extract(snapshot, &results.vector.items);
                render(
                    &programming,
                    Some(decision.context.recent_changes_summary.as_str()),
                )
            }
            None => format_vector_hits(results),
        };

        ContextResponse {
            session_state,
            short_term_memory,
            long_term_memory,
            relevant_knowledge,
        }
    }

    /// Short-term memory: a one-day timeline lookup through the
    /// current-session enrichment
    async fn recent_activity(&self, request: &ContextRequest) -> String {
        let mut query = TimelineQuery::from_text(enrich_query(
            QueryKind::Context,
            &request.query,
            self.config.cjk_enrichment,
        ));
        query.time_window = Some("1 days".to_string());

        let ctx = SearchContext {
            user_id: request.user_id.clone(),
            workspace_id: request.workspace_id(),
            key_concepts: Vec::new(),
            time_recall: false,
        };
        match self.timeline.search(&query, &ctx).await {
            Ok(events) if !events.is_empty() => events
                .iter()
                .map(|e| format!("- [{}] {}", e.timestamp.format("%H:%M"), e.title))
                .collect::<Vec<_>>()
                .join("\n"),
            Ok(_) => EMPTY_FIELD.to_string(),
            Err(e) => {
                warn!(session_id = %request.session_id, cause = %e, "short-term lookup failed");
                EMPTY_FIELD.to_string()
            }
        }
    }
}

/// Merge the analyzer's concept list into each vector sub-query text
fn fold_concepts_into_vector_queries(plan: &mut IntentPlan) {
    if plan.key_concepts.is_empty() {
        return;
    }
    let concepts = plan.key_concepts.join(" ");
    for query in &mut plan.vector_queries {
        if !query.text.contains(&concepts) {
            query.text = format!("{} {}", query.text, concepts);
        }
    }
}

fn parse_recall_time(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            RecallError::InvalidInput(format!(
                "unparseable time-recall bound {:?}, expected YYYY-MM-DD HH:MM:SS",
                value
            ))
        })
}

/// Session-state block rendered from the unified context
pub(crate) fn format_session_state(context: &UnifiedContext, confidence: f64) -> String {
    let topic = &context.current_topic;
    let mut lines = vec![format!(
        "主题: {}",
        if topic.main_topic.is_empty() { EMPTY_FIELD } else { &topic.main_topic }
    )];
    if !topic.user_intent.is_empty() {
        lines.push(format!("意图: {}", topic.user_intent));
    }
    if !context.project.name.is_empty() {
        lines.push(format!(
            "项目: {} ({})",
            context.project.name, context.project.primary_language
        ));
    }
    if !topic.key_concepts.is_empty() {
        let names: Vec<&str> = topic.key_concepts.iter().map(|c| c.name.as_str()).collect();
        lines.push(format!("关键概念: {}", names.join(", ")));
    }
    lines.push(format!("置信度: {:.2}", confidence.clamp(0.0, 1.0)));
    lines.join("\n")
}

/// Long-term memory block: strongest timeline events and knowledge nodes
fn format_long_term(results: &RetrievalResults) -> String {
    let mut lines: Vec<String> = Vec::new();
    for event in results.timeline.items.iter().take(5) {
        lines.push(format!(
            "- [{}] {}: {}",
            event.timestamp.format("%Y-%m-%d"),
            event.title,
            if event.summary.is_empty() { &event.content } else { &event.summary }
        ));
    }
    for hit in results.knowledge.items.iter().take(5) {
        let strongest = hit
            .relationships
            .iter()
            .max_by(|a, b| a.strength.partial_cmp(&b.strength).unwrap_or(std::cmp::Ordering::Equal));
        let relation = match strongest {
            Some(edge) => format!(
                " [{} {} {}]",
                edge.relation_type,
                edge.bucket().label(),
                edge.end
            ),
            None => String::new(),
        };
        lines.push(format!(
            "- 概念 {}: {}{}",
            hit.node.concept_name, hit.node.description, relation
        ));
    }
    if lines.is_empty() {
        EMPTY_FIELD.to_string()
    } else {
        lines.join("\n")
    }
}

fn format_vector_hits(results: &RetrievalResults) -> String {
    if results.vector.items.is_empty() {
        return EMPTY_FIELD.to_string();
    }
    results
        .vector
        .items
        .iter()
        .take(5)
        .map(|hit| {
            format!(
                "- {} ({:.2}): {}",
                hit.doc_id,
                hit.similarity,
                crate::utils::truncate_chars(&hit.content, 120)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
