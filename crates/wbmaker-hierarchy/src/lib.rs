//! Paths through a Wikibase subclass hierarchy.
//!
//! Given a start class and an ancestor (by default the instance's top
//! class), [`HierarchyAnalyzer`] finds the shortest connecting path and,
//! on request, the path among the first few simple paths that touches the
//! most entities present in a caller-supplied local lookup table.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use wbmaker::{Wb, WbConfig};
//! use wbmaker_hierarchy::{HierarchyAnalyzer, PathQuery};
//!
//! let wb = Wb::new(WbConfig::wikidata(), false)?;
//! let analyzer = HierarchyAnalyzer::for_wb(&wb);
//! if let Some(analysis) = analyzer.analyze(&PathQuery::new("Q5"), &HashMap::new()) {
//!     for step in &analysis.shortest_path {
//!         println!("{} {:?}", step.external_entity, step.external_label);
//!     }
//! }
//! # Ok::<(), wbmaker::WbError>(())
//! ```

pub mod analyzer;
pub mod error;
pub mod graph;
pub mod source;

pub use analyzer::{
    analyze_edges, local_link, EntityIndex, HierarchyAnalyzer, PathAnalysis, PathQuery, PathStep,
    DEFAULT_MAX_PATHS,
};
pub use error::{PathError, Result};
pub use graph::{HierarchyGraph, PetgraphHierarchy};
pub use source::{hierarchy_query, HierarchyEdge, HierarchySource, SparqlHierarchySource};
