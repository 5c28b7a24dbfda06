// crates/recall-server/src/engines/knowledge.rs
// Knowledge adapter: sub-queries -> bounded graph expansions

use super::{GraphEdge, KnowledgeExpandRequest, KnowledgeStore, SearchContext};
use crate::error::{RecallError, Result};
use recall_types::{KnowledgeHit, KnowledgeQuery, KnowledgeRelationship, RelationDirection};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::debug;

const MAX_DEPTH: u8 = 3;
const MIN_STRENGTH: f64 = 0.1;
const DEFAULT_LIMIT: usize = 20;

/// Adapter over the knowledge graph, late-bound like the other engines
pub struct KnowledgeAdapter {
    engine: RwLock<Option<Arc<dyn KnowledgeStore>>>,
}

impl KnowledgeAdapter {
    pub fn new() -> Self {
        Self {
            engine: RwLock::new(None),
        }
    }

    pub fn with_engine(engine: Arc<dyn KnowledgeStore>) -> Self {
        let adapter = Self::new();
        adapter.set_engine(engine);
        adapter
    }

    pub fn set_engine(&self, engine: Arc<dyn KnowledgeStore>) {
        if let Ok(mut slot) = self.engine.write() {
            *slot = Some(engine);
        }
    }

    fn engine(&self) -> Option<Arc<dyn KnowledgeStore>> {
        self.engine.read().ok().and_then(|slot| slot.clone())
    }

    /// Expand the graph around the query's concepts and emit one hit per
    /// node, carrying the relationship subset that touches it.
    pub async fn search(
        &self,
        query: &KnowledgeQuery,
        ctx: &SearchContext,
    ) -> Result<Vec<KnowledgeHit>> {
        let Some(engine) = self.engine() else {
            debug!("knowledge engine not bound, returning empty result");
            return Ok(Vec::new());
        };

        let request = KnowledgeExpandRequest {
            user_id: ctx.user_id.clone(),
            text: query.text.clone(),
            keywords: ctx.key_concepts.clone(),
            categories: query.concept_types.clone(),
            max_depth: query.max_depth.clamp(1, MAX_DEPTH),
            min_strength: query.min_strength.max(MIN_STRENGTH),
            limit: DEFAULT_LIMIT,
            query_type: "expand".to_string(),
        };

        let expansion = engine.expand(request).await.map_err(|e| {
            RecallError::Dimension {
                dimension: "knowledge",
                cause: e.to_string(),
            }
        })?;

        let known_ids: HashSet<&str> = expansion
            .nodes
            .iter()
            .map(|n| n.concept_id.as_str())
            .collect();

        let relation_filter: HashSet<&str> = query
            .relation_types
            .iter()
            .map(String::as_str)
            .collect();

        let hits = expansion
            .nodes
            .iter()
            .map(|node| {
                let mut node = node.clone();
                // Never expose a dangling reference
                node.related_concepts
                    .retain(|id| known_ids.contains(id.as_str()));

                let relationships = expansion
                    .relationships
                    .iter()
                    .filter(|edge| {
                        relation_filter.is_empty()
                            || relation_filter.contains(edge.relation_type.as_str())
                    })
                    .filter_map(|edge| tag_direction(edge, &node.concept_id))
                    .collect();

                KnowledgeHit {
                    node,
                    relationships,
                }
            })
            .collect();

        Ok(hits)
    }
}

impl Default for KnowledgeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-tag an undirected stored edge relative to one endpoint; edges that do
/// not touch the node are dropped
fn tag_direction(edge: &GraphEdge, concept_id: &str) -> Option<KnowledgeRelationship> {
    let direction = if edge.start == concept_id {
        RelationDirection::Outgoing
    } else if edge.end == concept_id {
        RelationDirection::Incoming
    } else {
        return None;
    };

    Some(KnowledgeRelationship {
        relation_type: edge.relation_type.clone(),
        start: edge.start.clone(),
        end: edge.end.clone(),
        strength: edge.strength,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::KnowledgeExpansion;
    use async_trait::async_trait;
    use recall_types::KnowledgeNode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingStore {
        seen: Mutex<Vec<KnowledgeExpandRequest>>,
        expansion: KnowledgeExpansion,
    }

    #[async_trait]
    impl KnowledgeStore for RecordingStore {
        async fn expand(
            &self,
            request: KnowledgeExpandRequest,
        ) -> anyhow::Result<KnowledgeExpansion> {
            self.seen.lock().unwrap().push(request);
            Ok(self.expansion.clone())
        }
    }

    fn node(id: &str, related: &[&str]) -> KnowledgeNode {
        KnowledgeNode {
            concept_id: id.into(),
            concept_name: id.into(),
            concept_type: "technical".into(),
            description: String::new(),
            related_concepts: related.iter().map(|s| s.to_string()).collect(),
            relevance_score: 0.9,
            confidence_score: 0.8,
            properties: HashMap::new(),
        }
    }

    fn edge(start: &str, end: &str, strength: f64) -> GraphEdge {
        GraphEdge {
            relation_type: "depends_on".into(),
            start: start.into(),
            end: end.into(),
            strength,
        }
    }

    #[tokio::test]
    async fn test_unbound_engine_returns_empty_success() {
        let adapter = KnowledgeAdapter::new();
        let hits = adapter
            .search(&KnowledgeQuery::from_text("q"), &SearchContext::default())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_depth_and_strength_bounds_enforced() {
        let store = Arc::new(RecordingStore {
            seen: Mutex::new(vec![]),
            expansion: KnowledgeExpansion::default(),
        });
        let adapter = KnowledgeAdapter::with_engine(store.clone());

        let mut query = KnowledgeQuery::from_text("q");
        query.max_depth = 7;
        query.min_strength = 0.01;
        adapter.search(&query, &SearchContext::default()).await.unwrap();

        let seen = store.seen.lock().unwrap();
        assert_eq!(seen[0].max_depth, 3);
        assert_eq!(seen[0].min_strength, 0.1);
    }

    #[tokio::test]
    async fn test_relationships_tagged_by_direction() {
        let store = Arc::new(RecordingStore {
            seen: Mutex::new(vec![]),
            expansion: KnowledgeExpansion {
                nodes: vec![node("a", &[]), node("b", &[])],
                relationships: vec![edge("a", "b", 0.9)],
            },
        });
        let adapter = KnowledgeAdapter::with_engine(store);
        let hits = adapter
            .search(&KnowledgeQuery::from_text("q"), &SearchContext::default())
            .await
            .unwrap();

        let a = hits.iter().find(|h| h.node.concept_id == "a").unwrap();
        let b = hits.iter().find(|h| h.node.concept_id == "b").unwrap();
        assert_eq!(a.relationships[0].direction, RelationDirection::Outgoing);
        assert_eq!(b.relationships[0].direction, RelationDirection::Incoming);
    }

    #[tokio::test]
    async fn test_dangling_related_concepts_filtered() {
        let store = Arc::new(RecordingStore {
            seen: Mutex::new(vec![]),
            expansion: KnowledgeExpansion {
                nodes: vec![node("a", &["b", "ghost"]), node("b", &[])],
                relationships: vec![],
            },
        });
        let adapter = KnowledgeAdapter::with_engine(store);
        let hits = adapter
            .search(&KnowledgeQuery::from_text("q"), &SearchContext::default())
            .await
            .unwrap();

        let a = hits.iter().find(|h| h.node.concept_id == "a").unwrap();
        assert_eq!(a.node.related_concepts, vec!["b"]);
    }

    #[tokio::test]
    async fn test_relation_type_filter() {
        let mut other = edge("a", "b", 0.5);
        other.relation_type = "contains".into();
        let store = Arc::new(RecordingStore {
            seen: Mutex::new(vec![]),
            expansion: KnowledgeExpansion {
                nodes: vec![node("a", &[])],
                relationships: vec![edge("a", "b", 0.9), other],
            },
        });
        let adapter = KnowledgeAdapter::with_engine(store);

        let mut query = KnowledgeQuery::from_text("q");
        query.relation_types = vec!["depends_on".into()];
        let hits = adapter.search(&query, &SearchContext::default()).await.unwrap();
        assert_eq!(hits[0].relationships.len(), 1);
        assert_eq!(hits[0].relationships[0].relation_type, "depends_on");
    }
}
