// crates/recall-server/src/session/mod.rs
// Session context manager: owns the in-memory session -> unified-context
// map, applies update/persist thresholds, TTL-evicts idle sessions.

use crate::config::PipelineConfig;
use crate::synthesis::SynthesisOutcome;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use chrono::Utc;
use recall_types::{ContextRequest, KeyConcept, UnifiedContext};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

/// Confidence reported when synthesis failed and the stored (or downgrade)
/// context is served instead
const DOWNGRADE_CONFIDENCE: f64 = 0.3;

/// Durable home for session contexts. Persistence backends (user/session
/// repositories) are external collaborators.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn persist(&self, context: &UnifiedContext) -> anyhow::Result<()>;
}

/// What an update round decided
#[derive(Debug, Clone)]
pub struct ContextDecision {
    pub context: UnifiedContext,
    pub confidence: f64,
    pub updated: bool,
    /// Human-readable note when the result is a downgrade
    pub downgrade_reason: Option<String>,
}

pub struct SessionContextManager {
    sessions: RwLock<HashMap<String, UnifiedContext>>,
    store: Option<Arc<dyn ContextStore>>,
    persistence_threshold: f64,
    cache_expiry: Duration,
    eviction_interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl SessionContextManager {
    pub fn new(config: &PipelineConfig, store: Option<Arc<dyn ContextStore>>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            persistence_threshold: config.persistence_threshold,
            cache_expiry: config.cache_expiry,
            eviction_interval: config.eviction_interval,
            shutdown,
        }
    }

    /// Snapshot of the stored context for a session, if any. The lock is
    /// released before any LLM or retrieval work happens.
    pub async fn get(&self, session_id: &str) -> Option<UnifiedContext> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Stored context for the session, lazily created from the downgrade
    /// constructor on first contact. Used by the non-LLM basic service.
    pub async fn get_or_create_basic(&self, request: &ContextRequest) -> UnifiedContext {
        if let Some(existing) = self.get(&request.session_id).await {
            return existing;
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(request.session_id.clone())
            .or_insert_with(|| basic_context(request))
            .clone()
    }

    /// Apply a synthesis outcome under the update policy.
    ///
    /// The commit re-acquires the write lock and overwrites unconditionally
    /// (last-writer-wins); callers must not hold any snapshot as authoritative
    /// afterward.
    pub async fn apply(
        &self,
        request: &ContextRequest,
        outcome: SynthesisOutcome,
    ) -> ContextDecision {
        let mut sessions = self.sessions.write().await;
        let current = sessions.get(&request.session_id).cloned();
        let first_time = current.is_none();

        let Some(evaluation) = outcome.evaluation else {
            // Evaluation failure: never mutate an existing context
            return if let Some(existing) = current {
                ContextDecision {
                    context: existing,
                    confidence: DOWNGRADE_CONFIDENCE,
                    updated: false,
                    downgrade_reason: Some(
                        "synthesis evaluation unavailable; serving stored context".into(),
                    ),
                }
            } else {
                let basic = basic_context(request);
                sessions.insert(request.session_id.clone(), basic.clone());
                ContextDecision {
                    context: basic,
                    confidence: DOWNGRADE_CONFIDENCE,
                    updated: false,
                    downgrade_reason: Some(
                        "synthesis evaluation unavailable on first contact; built basic context"
                            .into(),
                    ),
                }
            };
        };

        if !evaluation.should_update {
            debug!(
                session_id = %request.session_id,
                confidence = evaluation.update_confidence,
                reason = %evaluation.evaluation_reason,
                "synthesis declined update"
            );
            let context = match current {
                Some(existing) => existing,
                None => {
                    // Lazy first-time creation still happens
                    let basic = outcome.context.unwrap_or_else(|| basic_context(request));
                    sessions.insert(request.session_id.clone(), basic.clone());
                    basic
                }
            };
            return ContextDecision {
                context,
                confidence: evaluation.update_confidence,
                updated: false,
                downgrade_reason: None,
            };
        }

        // Update path. A missing synthesized context on first contact means
        // the downgrade constructor; on a live session it means keeping the
        // stored context untouched.
        let Some(mut context) = outcome.context else {
            return if first_time {
                let basic = basic_context(request);
                sessions.insert(request.session_id.clone(), basic.clone());
                ContextDecision {
                    context: basic,
                    confidence: DOWNGRADE_CONFIDENCE,
                    updated: false,
                    downgrade_reason: Some(
                        "synthesized context missing on first contact; built basic context".into(),
                    ),
                }
            } else {
                ContextDecision {
                    context: current.unwrap_or_else(|| basic_context(request)),
                    confidence: evaluation.update_confidence,
                    updated: false,
                    downgrade_reason: Some("synthesized context missing; kept stored".into()),
                }
            };
        };

        // Ownership always comes from the request, never the model
        context.rebind(&request.session_id, &request.user_id, &request.workspace_id());
        let mut now = Utc::now();
        if let Some(ref prev) = current {
            context.created_at = prev.created_at;
            if now <= prev.updated_at {
                now = prev.updated_at + chrono::Duration::milliseconds(1);
            }
        }
        context.updated_at = now;

        sessions.insert(request.session_id.clone(), context.clone());
        drop(sessions);

        if evaluation.update_confidence >= self.persistence_threshold {
            self.schedule_persist(context.clone());
        }

        info!(
            session_id = %request.session_id,
            confidence = evaluation.update_confidence,
            "session context updated"
        );
        ContextDecision {
            context,
            confidence: evaluation.update_confidence,
            updated: true,
            downgrade_reason: None,
        }
    }

    /// Persistence never blocks the response
    fn schedule_persist(&self, context: UnifiedContext) {
        let Some(store) = self.store.clone() else {
            return;
        };
        tokio::spawn(async move {
            let session_id = context.session_id.clone();
            if let Err(e) = store.persist(&context).await {
                warn!(session_id = %session_id, cause = %e, "async context persistence failed");
            } else {
                debug!(session_id = %session_id, "context persisted");
            }
        });
    }

    /// Drop a session's context immediately
    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// Start the periodic eviction scan. Runs until `stop` is called.
    pub fn start_eviction(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        let interval = self.eviction_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = manager.evict_expired().await;
                        if evicted > 0 {
                            info!(evicted, "evicted idle session contexts");
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            debug!("eviction ticker stopping");
                            break;
                        }
                    }
                }
            }
        });
    }

    /// One eviction pass: delete every entry idle longer than the expiry
    pub async fn evict_expired(&self) -> usize {
        let expiry = match chrono::Duration::from_std(self.cache_expiry) {
            Ok(d) => d,
            Err(_) => return 0,
        };
        let cutoff = Utc::now() - expiry;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, ctx| ctx.updated_at >= cutoff);
        before - sessions.len()
    }

    /// Stop the eviction ticker; no further evictions fire. Idempotent.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Minimal downgrade context built when synthesis (or retrieval) fails on a
/// first-time session
pub fn basic_context(request: &ContextRequest) -> UnifiedContext {
    let mut context = UnifiedContext::new(
        request.session_id.clone(),
        request.user_id.clone(),
        request.workspace_id(),
    );
    context.current_topic.main_topic = truncate_chars(&request.query, 50);
    context.current_topic.user_intent = request.query.clone();
    context.current_topic.confidence_level = DOWNGRADE_CONFIDENCE;
    context.current_topic.key_concepts = vec![KeyConcept {
        name: "user_query".into(),
        concept_type: "technical".into(),
        definition: request.query.clone(),
        importance: 0.8,
    }];
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_types::SynthesisEvaluation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        persisted: AtomicUsize,
    }

    #[async_trait]
    impl ContextStore for CountingStore {
        async fn persist(&self, _context: &UnifiedContext) -> anyhow::Result<()> {
            self.persisted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn request() -> ContextRequest {
        ContextRequest::new("u-1", "/tmp/ws", "s-1", "how do I tune the cache for hot keys?")
    }

    fn evaluation(should_update: bool, confidence: f64) -> SynthesisEvaluation {
        SynthesisEvaluation {
            should_update,
            update_confidence: confidence,
            evaluation_reason: "test".into(),
            semantic_changes: vec![],
        }
    }

    fn synthesized(topic: &str) -> UnifiedContext {
        let mut ctx = UnifiedContext::new("model-said", "model-said", "model-said");
        ctx.current_topic.main_topic = topic.into();
        ctx
    }

    fn manager(store: Option<Arc<dyn ContextStore>>) -> SessionContextManager {
        SessionContextManager::new(&PipelineConfig::default(), store)
    }

    // ========================================================================
    // Basic context
    // ========================================================================

    #[test]
    fn test_basic_context_shape() {
        let mut req = request();
        req.query = "x".repeat(80);
        let ctx = basic_context(&req);
        assert_eq!(ctx.current_topic.main_topic.chars().count(), 53);
        assert!(ctx.current_topic.main_topic.ends_with("..."));
        assert_eq!(ctx.current_topic.confidence_level, 0.3);
        assert_eq!(ctx.current_topic.key_concepts.len(), 1);
        assert_eq!(ctx.current_topic.key_concepts[0].name, "user_query");
        assert_eq!(ctx.current_topic.key_concepts[0].importance, 0.8);
        assert_eq!(ctx.workspace_id, "ws");
    }

    // ========================================================================
    // Update policy
    // ========================================================================

    #[tokio::test]
    async fn test_should_update_commits_and_rebinds() {
        let mgr = manager(None);
        let outcome = SynthesisOutcome {
            evaluation: Some(evaluation(true, 0.85)),
            context: Some(synthesized("cache tuning")),
        };
        let decision = mgr.apply(&request(), outcome).await;

        assert!(decision.updated);
        assert_eq!(decision.context.session_id, "s-1");
        assert_eq!(decision.context.user_id, "u-1");
        assert_eq!(decision.context.workspace_id, "ws");
        assert_eq!(mgr.session_count().await, 1);
        assert_eq!(
            mgr.get("s-1").await.unwrap().current_topic.main_topic,
            "cache tuning"
        );
    }

    #[tokio::test]
    async fn test_updated_at_strictly_increases() {
        let mgr = manager(None);
        let first = mgr
            .apply(
                &request(),
                SynthesisOutcome {
                    evaluation: Some(evaluation(true, 0.8)),
                    context: Some(synthesized("one")),
                },
            )
            .await;
        let second = mgr
            .apply(
                &request(),
                SynthesisOutcome {
                    evaluation: Some(evaluation(true, 0.8)),
                    context: Some(synthesized("two")),
                },
            )
            .await;
        assert!(second.context.updated_at > first.context.updated_at);
        assert_eq!(second.context.created_at, first.context.created_at);
        // Still exactly one entry for the session
        assert_eq!(mgr.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_nil_evaluation_never_mutates() {
        let mgr = manager(None);
        mgr.apply(
            &request(),
            SynthesisOutcome {
                evaluation: Some(evaluation(true, 0.9)),
                context: Some(synthesized("established")),
            },
        )
        .await;

        let decision = mgr
            .apply(
                &request(),
                SynthesisOutcome {
                    evaluation: None,
                    context: Some(synthesized("should be ignored")),
                },
            )
            .await;

        assert!(!decision.updated);
        assert_eq!(decision.confidence, 0.3);
        assert!(decision.downgrade_reason.is_some());
        assert_eq!(
            mgr.get("s-1").await.unwrap().current_topic.main_topic,
            "established"
        );
    }

    #[tokio::test]
    async fn test_nil_context_on_first_contact_builds_basic() {
        let mgr = manager(None);
        let decision = mgr
            .apply(
                &request(),
                SynthesisOutcome {
                    evaluation: Some(evaluation(true, 0.9)),
                    context: None,
                },
            )
            .await;

        assert!(!decision.updated);
        assert_eq!(decision.confidence, 0.3);
        assert_eq!(decision.context.current_topic.key_concepts[0].name, "user_query");
        assert_eq!(mgr.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_should_update_false_returns_current() {
        let mgr = manager(None);
        mgr.apply(
            &request(),
            SynthesisOutcome {
                evaluation: Some(evaluation(true, 0.9)),
                context: Some(synthesized("established")),
            },
        )
        .await;

        let decision = mgr
            .apply(
                &request(),
                SynthesisOutcome {
                    evaluation: Some(evaluation(false, 0.55)),
                    context: Some(synthesized("rejected")),
                },
            )
            .await;

        assert!(!decision.updated);
        assert_eq!(decision.confidence, 0.55);
        assert_eq!(
            mgr.get("s-1").await.unwrap().current_topic.main_topic,
            "established"
        );
    }

    // ========================================================================
    // Persistence threshold
    // ========================================================================

    #[tokio::test]
    async fn test_persistence_scheduled_above_threshold() {
        let store = Arc::new(CountingStore {
            persisted: AtomicUsize::new(0),
        });
        let mgr = manager(Some(store.clone()));
        mgr.apply(
            &request(),
            SynthesisOutcome {
                evaluation: Some(evaluation(true, 0.75)),
                context: Some(synthesized("t")),
            },
        )
        .await;

        // The persist task runs detached from the response
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.persisted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_persistence_skipped_below_threshold() {
        let store = Arc::new(CountingStore {
            persisted: AtomicUsize::new(0),
        });
        let mgr = manager(Some(store.clone()));
        mgr.apply(
            &request(),
            SynthesisOutcome {
                evaluation: Some(evaluation(true, 0.5)),
                context: Some(synthesized("t")),
            },
        )
        .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.persisted.load(Ordering::SeqCst), 0);
    }

    // ========================================================================
    // Eviction
    // ========================================================================

    fn short_lived_config() -> PipelineConfig {
        PipelineConfig {
            cache_expiry: Duration::from_millis(80),
            eviction_interval: Duration::from_millis(40),
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_eviction_removes_idle_sessions() {
        let mgr = Arc::new(SessionContextManager::new(&short_lived_config(), None));
        mgr.apply(
            &request(),
            SynthesisOutcome {
                evaluation: Some(evaluation(true, 0.8)),
                context: Some(synthesized("t")),
            },
        )
        .await;
        assert_eq!(mgr.session_count().await, 1);

        mgr.start_eviction();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(mgr.session_count().await, 0);
        mgr.stop();
    }

    #[tokio::test]
    async fn test_fresh_sessions_survive_eviction_pass() {
        let mgr = Arc::new(SessionContextManager::new(&PipelineConfig::default(), None));
        mgr.apply(
            &request(),
            SynthesisOutcome {
                evaluation: Some(evaluation(true, 0.8)),
                context: Some(synthesized("t")),
            },
        )
        .await;
        assert_eq!(mgr.evict_expired().await, 0);
        assert_eq!(mgr.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_stop_halts_future_evictions() {
        let mgr = Arc::new(SessionContextManager::new(&short_lived_config(), None));
        mgr.start_eviction();
        mgr.stop();
        // Give the ticker a moment to observe the signal
        tokio::time::sleep(Duration::from_millis(60)).await;

        mgr.apply(
            &request(),
            SynthesisOutcome {
                evaluation: Some(evaluation(true, 0.8)),
                context: Some(synthesized("t")),
            },
        )
        .await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        // Entry is stale but the ticker is gone
        assert_eq!(mgr.session_count().await, 1);
        // Stopping again is a no-op
        mgr.stop();
    }
}
