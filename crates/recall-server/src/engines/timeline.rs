// crates/recall-server/src/engines/timeline.rs
// Timeline adapter: uniform sub-queries -> native event-store queries

use super::{SearchContext, TimelineSearchRequest, TimelineStore};
use crate::error::{RecallError, Result};
use chrono::{DateTime, Utc};
use recall_types::{TimelineQuery, TimelineEvent};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Window applied when a sub-query names neither explicit bounds nor a
/// relative window
const DEFAULT_TIME_WINDOW: &str = "30 days";
/// Relevance floor for ordinary queries; time-recall skips it
const MIN_RELEVANCE: f64 = 0.1;
const DEFAULT_LIMIT: usize = 10;
const ORDER_BY: &str = "timestamp desc, importance_score desc";

/// Adapter over the timeline event store.
///
/// Engines are constructed asynchronously at startup, so the handle is
/// late-bound: `search` before `set_engine` returns empty-success rather
/// than failing the fan-out.
pub struct TimelineAdapter {
    engine: RwLock<Option<Arc<dyn TimelineStore>>>,
}

impl TimelineAdapter {
    pub fn new() -> Self {
        Self {
            engine: RwLock::new(None),
        }
    }

    pub fn with_engine(engine: Arc<dyn TimelineStore>) -> Self {
        let adapter = Self::new();
        adapter.set_engine(engine);
        adapter
    }

    /// Late-bind the underlying engine
    pub fn set_engine(&self, engine: Arc<dyn TimelineStore>) {
        if let Ok(mut slot) = self.engine.write() {
            *slot = Some(engine);
        }
    }

    fn engine(&self) -> Option<Arc<dyn TimelineStore>> {
        self.engine.read().ok().and_then(|slot| slot.clone())
    }

    /// Run one sub-query and normalize the results
    pub async fn search(
        &self,
        query: &TimelineQuery,
        ctx: &SearchContext,
    ) -> Result<Vec<TimelineEvent>> {
        let Some(engine) = self.engine() else {
            debug!("timeline engine not bound, returning empty result");
            return Ok(Vec::new());
        };

        let explicit_window = query.start_time.is_some() && query.end_time.is_some();
        let request = TimelineSearchRequest {
            user_id: ctx.user_id.clone(),
            workspace_id: ctx.workspace_id.clone(),
            text: query.text.clone(),
            keywords: ctx.key_concepts.clone(),
            start_time: query.start_time,
            end_time: query.end_time,
            time_window: if explicit_window {
                None
            } else {
                Some(
                    query
                        .time_window
                        .clone()
                        .unwrap_or_else(|| DEFAULT_TIME_WINDOW.to_string()),
                )
            },
            event_types: query.event_types.clone(),
            limit: query.max_results.unwrap_or(DEFAULT_LIMIT),
            min_relevance: if ctx.time_recall { 0.0 } else { MIN_RELEVANCE },
            order_by: ORDER_BY.to_string(),
        };

        let mut events = engine.search(request).await.map_err(|e| {
            RecallError::Dimension {
                dimension: "timeline",
                cause: e.to_string(),
            }
        })?;

        if !ctx.time_recall {
            events.retain(|e| e.relevance_score >= MIN_RELEVANCE);
        }
        sort_events(&mut events);
        Ok(events)
    }

    /// Pure window query for the time-recall fast path: no keyword filter,
    /// no relevance floor, newest first.
    pub async fn search_window(
        &self,
        user_id: &str,
        workspace_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TimelineEvent>> {
        let Some(engine) = self.engine() else {
            return Ok(Vec::new());
        };

        let request = TimelineSearchRequest {
            user_id: user_id.to_string(),
            workspace_id: workspace_id.to_string(),
            text: String::new(),
            keywords: Vec::new(),
            start_time: Some(start),
            end_time: Some(end),
            time_window: None,
            event_types: Vec::new(),
            limit,
            min_relevance: 0.0,
            order_by: ORDER_BY.to_string(),
        };

        let mut events = engine.search(request).await.map_err(|e| {
            RecallError::Dimension {
                dimension: "timeline",
                cause: e.to_string(),
            }
        })?;
        sort_events(&mut events);
        events.truncate(limit);
        Ok(events)
    }
}

impl Default for TimelineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_events(events: &mut [TimelineEvent]) {
    events.sort_by(|a, b| {
        b.timestamp.cmp(&a.timestamp).then_with(|| {
            b.importance_score
                .partial_cmp(&a.importance_score)
                .unwrap_or(Ordering::Equal)
        })
    });
}
