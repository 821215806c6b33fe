//! Shortest and best-annotated paths between two classes.
//!
//! ```text
//!   HierarchySource ──rows──► EntityIndex (labels, descriptions)
//!                      └────► HierarchyGraph ──► shortest path
//!                                           └──► first `max_paths` simple paths
//!                                                 scored by local-link count
//! ```
//!
//! Every call fetches its rows once and builds a fresh graph; nothing is
//! cached between calls.

use crate::error::{PathError, Result};
use crate::graph::{HierarchyGraph, PetgraphHierarchy};
use crate::source::{HierarchyEdge, HierarchySource, SparqlHierarchySource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wbmaker::config::{WIKIDATA_ENTITY_NAMESPACE, WIKIDATA_TOP_CLASS};
use wbmaker::sparql::{entity_id_from_uri, SparqlClient};
use wbmaker::Wb;

pub const DEFAULT_MAX_PATHS: usize = 10;

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub external_entity: String,
    pub external_label: Option<String>,
    pub external_description: Option<String>,
    pub local_entity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathAnalysis {
    pub shortest_path: Vec<PathStep>,
    /// Empty when not requested or when no examined path has more than one
    /// local link.
    pub alternate_path: Vec<PathStep>,
}

impl PathAnalysis {
    pub fn has_alternate(&self) -> bool {
        !self.alternate_path.is_empty()
    }

    /// Steps of the alternate path that carry a local identifier.
    pub fn alternate_links(&self) -> usize {
        self.alternate_path
            .iter()
            .filter(|s| s.local_entity.is_some())
            .count()
    }
}

// ============================================================================
// Query
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    pub start: String,
    /// `None` means the analyzer's default top class.
    pub end: Option<String>,
    pub want_alternate: bool,
    pub max_paths: usize,
}

impl PathQuery {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
            want_alternate: false,
            max_paths: DEFAULT_MAX_PATHS,
        }
    }

    pub fn to(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn alternate(mut self, want: bool) -> Self {
        self.want_alternate = want;
        self
    }

    pub fn max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }
}

// ============================================================================
// Entity index
// ============================================================================

/// Labels and descriptions of every identifier seen in the rows.
///
/// Columns merge in the order item, subclass_of, next_subclass; a later
/// column overwrites an earlier one, and an identifier without a label is
/// still a key.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    labels: HashMap<String, Option<String>>,
    descriptions: HashMap<String, Option<String>>,
}

impl EntityIndex {
    pub fn from_edges(edges: &[HierarchyEdge]) -> Self {
        let mut index = Self::default();
        for edge in edges {
            index.merge(&edge.item, &edge.item_label, &edge.item_description);
        }
        for edge in edges {
            index.merge(&edge.subclass_of, &edge.subclass_of_label, &edge.subclass_of_description);
        }
        for edge in edges {
            index.merge(
                &edge.next_subclass,
                &edge.next_subclass_label,
                &edge.next_subclass_description,
            );
        }
        index
    }

    fn merge(&mut self, id: &str, label: &Option<String>, description: &Option<String>) {
        self.labels.insert(id.to_string(), label.clone());
        self.descriptions.insert(id.to_string(), description.clone());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.labels.contains_key(id)
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.labels.get(id).and_then(|l| l.as_deref())
    }

    pub fn description(&self, id: &str) -> Option<&str> {
        self.descriptions.get(id).and_then(|d| d.as_deref())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Local identifier linked to `uri`, keyed by full URI or bare id.
/// Empty values are no link.
pub fn local_link<'a>(lookup: &'a HashMap<String, String>, uri: &str) -> Option<&'a str> {
    [uri, entity_id_from_uri(uri)]
        .into_iter()
        .filter_map(|key| lookup.get(key))
        .map(String::as_str)
        .find(|local| !local.is_empty())
}

fn steps(path: &[String], index: &EntityIndex, lookup: &HashMap<String, String>) -> Vec<PathStep> {
    path.iter()
        .map(|uri| PathStep {
            external_entity: uri.clone(),
            external_label: index.label(uri).map(str::to_string),
            external_description: index.description(uri).map(str::to_string),
            local_entity: local_link(lookup, uri).map(str::to_string),
        })
        .collect()
}

// ============================================================================
// Core
// ============================================================================

/// Analyze already-fetched rows. `start_uri` and `end_uri` are full URIs.
pub fn analyze_edges<G: HierarchyGraph + Default>(
    edges: &[HierarchyEdge],
    start_uri: &str,
    end_uri: &str,
    lookup: &HashMap<String, String>,
    want_alternate: bool,
    max_paths: usize,
) -> Result<PathAnalysis> {
    if edges.is_empty() {
        return Err(PathError::NoData {
            reason: "hierarchy query returned no rows".to_string(),
        });
    }

    let index = EntityIndex::from_edges(edges);
    for uri in [start_uri, end_uri] {
        if !index.contains(uri) {
            return Err(PathError::EndpointNotFound(uri.to_string()));
        }
    }

    let mut graph = G::default();
    for edge in edges {
        graph.add_edge(&edge.item, &edge.subclass_of);
        graph.add_edge(&edge.subclass_of, &edge.next_subclass);
    }
    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "hierarchy graph built"
    );

    let shortest = graph
        .shortest_path(start_uri, end_uri)
        .ok_or_else(|| PathError::NoPath {
            from: start_uri.to_string(),
            to: end_uri.to_string(),
        })?;

    let mut analysis = PathAnalysis {
        shortest_path: steps(&shortest, &index, lookup),
        alternate_path: Vec::new(),
    };
    if !want_alternate {
        return Ok(analysis);
    }

    let mut best: Option<(usize, Vec<String>)> = None;
    for path in graph.simple_paths(start_uri, end_uri).take(max_paths) {
        let links = path
            .iter()
            .filter(|uri| local_link(lookup, uri).is_some())
            .count();
        if links <= 1 {
            continue;
        }
        // Strictly greater: the first enumerated path wins a tie.
        if best.as_ref().map_or(true, |(top, _)| links > *top) {
            best = Some((links, path));
        }
    }

    match best {
        Some((links, path)) => {
            tracing::debug!(links, len = path.len(), "alternate path selected");
            analysis.alternate_path = steps(&path, &index, lookup);
        }
        None => tracing::debug!("no alternate path with more than one local link"),
    }
    Ok(analysis)
}

// ============================================================================
// Analyzer
// ============================================================================

pub struct HierarchyAnalyzer<S> {
    source: S,
    namespace: String,
    default_top_class: String,
}

impl<S: HierarchySource> HierarchyAnalyzer<S> {
    /// Analyzer with Wikidata's entity namespace and top class.
    pub fn new(source: S) -> Self {
        Self {
            source,
            namespace: WIKIDATA_ENTITY_NAMESPACE.to_string(),
            default_top_class: WIKIDATA_TOP_CLASS.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_default_top_class(mut self, class: impl Into<String>) -> Self {
        self.default_top_class = class.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn default_top_class(&self) -> &str {
        &self.default_top_class
    }

    /// Full URI of an entity id. Values that are already URIs pass through.
    pub fn entity_uri(&self, id: &str) -> String {
        if id.contains("://") {
            id.to_string()
        } else {
            format!("{}{}", self.namespace, id)
        }
    }

    /// Like [`analyze`](Self::analyze), but says why there is no result.
    pub fn diagnose(&self, query: &PathQuery, lookup: &HashMap<String, String>) -> Result<PathAnalysis> {
        let start_uri = self.entity_uri(&query.start);
        let end_uri = self.entity_uri(query.end.as_deref().unwrap_or(&self.default_top_class));
        tracing::debug!(start = %start_uri, end = %end_uri, "fetching hierarchy");

        let edges = self.source.subclass_edges(&start_uri)?;
        analyze_edges::<PetgraphHierarchy>(
            &edges,
            &start_uri,
            &end_uri,
            lookup,
            query.want_alternate,
            query.max_paths,
        )
    }

    /// Shortest (and optionally alternate) path, or `None` when there is no
    /// data, an endpoint is unknown, or the two are not connected.
    pub fn analyze(&self, query: &PathQuery, lookup: &HashMap<String, String>) -> Option<PathAnalysis> {
        match self.diagnose(query, lookup) {
            Ok(analysis) => Some(analysis),
            Err(reason) => {
                tracing::debug!(%reason, start = %query.start, "no hierarchy path");
                None
            }
        }
    }
}

impl<'a> HierarchyAnalyzer<SparqlHierarchySource<&'a SparqlClient>> {
    /// Analyzer over the instance's own query service and subclass property.
    pub fn for_wb(wb: &'a Wb) -> Self {
        let config = wb.config();
        let property_uri = config.direct_property_uri(config.subclass_of_property());
        Self::new(SparqlHierarchySource::new(wb.sparql(), property_uri))
            .with_namespace(config.entity_namespace())
            .with_default_top_class(config.default_top_class())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(item: &str, label: Option<&str>, sub: &str, sub_label: Option<&str>, next: &str) -> HierarchyEdge {
        HierarchyEdge {
            item_label: label.map(str::to_string),
            subclass_of_label: sub_label.map(str::to_string),
            ..HierarchyEdge::new(item, sub, next)
        }
    }

    #[test]
    fn test_index_merge_is_column_major_last_writer_wins() {
        // B is labelled in row 0 as subclass_of and in row 1 as item; the
        // subclass_of column merges later and wins.
        let edges = vec![
            edge("A", Some("a"), "B", Some("from-subclass"), "C"),
            edge("B", Some("from-item"), "C", None, "D"),
        ];
        let index = EntityIndex::from_edges(&edges);
        assert_eq!(index.label("B"), Some("from-subclass"));
        // C is last seen as subclass_of with no label: still a key.
        assert!(index.contains("C"));
        assert_eq!(index.label("C"), None);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_local_link_resolution() {
        let lookup: HashMap<String, String> = [
            ("http://e/Q1".to_string(), "full".to_string()),
            ("Q2".to_string(), "bare".to_string()),
            ("Q3".to_string(), String::new()),
        ]
        .into_iter()
        .collect();
        assert_eq!(local_link(&lookup, "http://e/Q1"), Some("full"));
        assert_eq!(local_link(&lookup, "http://e/Q2"), Some("bare"));
        assert_eq!(local_link(&lookup, "http://e/Q3"), None);
        assert_eq!(local_link(&lookup, "http://e/Q4"), None);
    }

    #[test]
    fn test_entity_uri() {
        let analyzer = HierarchyAnalyzer::new(Vec::<HierarchyEdge>::new()).with_namespace("http://e/");
        assert_eq!(analyzer.entity_uri("Q5"), "http://e/Q5");
        assert_eq!(analyzer.entity_uri("http://x/Q5"), "http://x/Q5");
        assert_eq!(analyzer.default_top_class(), "Q35120");
    }

    #[test]
    fn test_no_rows_is_no_data() {
        let err = analyze_edges::<PetgraphHierarchy>(&[], "A", "B", &HashMap::new(), true, 10)
            .unwrap_err();
        assert!(matches!(err, PathError::NoData { .. }));
    }

    #[test]
    fn test_query_builder() {
        let q = PathQuery::new("Q5").to("Q1").alternate(true).max_paths(3);
        assert_eq!(q.end.as_deref(), Some("Q1"));
        assert!(q.want_alternate);
        assert_eq!(q.max_paths, 3);
        assert_eq!(PathQuery::new("Q5").max_paths, DEFAULT_MAX_PATHS);
    }
}
