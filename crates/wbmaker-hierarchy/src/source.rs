//! Where hierarchy rows come from.

use crate::PathError;
use serde::{Deserialize, Serialize};
use wbmaker::sparql::{SparqlExecutor, SparqlRecord};

pub const COL_ITEM: &str = "item";
pub const COL_SUBCLASS_OF: &str = "subclass_of";
pub const COL_NEXT_SUBCLASS: &str = "next_subclass";

/// One row of the hierarchy query: `item → subclass_of → next_subclass`,
/// with labels and descriptions of all three.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub item: String,
    pub item_label: Option<String>,
    pub item_description: Option<String>,
    pub subclass_of: String,
    pub subclass_of_label: Option<String>,
    pub subclass_of_description: Option<String>,
    pub next_subclass: String,
    pub next_subclass_label: Option<String>,
    pub next_subclass_description: Option<String>,
}

impl HierarchyEdge {
    /// Bare row without labels, mostly for tests.
    pub fn new(item: &str, subclass_of: &str, next_subclass: &str) -> Self {
        Self {
            item: item.to_string(),
            subclass_of: subclass_of.to_string(),
            next_subclass: next_subclass.to_string(),
            ..Self::default()
        }
    }

    pub fn from_record(row: usize, record: &SparqlRecord) -> Result<Self, PathError> {
        let get = |column: &str| record.get(column).cloned().flatten();
        let required = |column: &'static str| {
            get(column).ok_or(PathError::Malformed { row, column })
        };
        Ok(Self {
            item: required(COL_ITEM)?,
            item_label: get("itemLabel"),
            item_description: get("itemDescription"),
            subclass_of: required(COL_SUBCLASS_OF)?,
            subclass_of_label: get("subclass_ofLabel"),
            subclass_of_description: get("subclass_ofDescription"),
            next_subclass: required(COL_NEXT_SUBCLASS)?,
            next_subclass_label: get("next_subclassLabel"),
            next_subclass_description: get("next_subclassDescription"),
        })
    }
}

/// Supplies every subclass-of edge reachable from a start entity.
pub trait HierarchySource {
    /// Rows for the entity with full URI `start_uri`. No data is an empty
    /// vector or [`PathError::NoData`].
    fn subclass_edges(&self, start_uri: &str) -> Result<Vec<HierarchyEdge>, PathError>;
}

impl HierarchySource for Vec<HierarchyEdge> {
    fn subclass_edges(&self, _start_uri: &str) -> Result<Vec<HierarchyEdge>, PathError> {
        Ok(self.clone())
    }
}

/// SELECT over `subclass_property_uri`: everything reachable from `start_uri`
/// through zero or more hops, plus one further hop from each reached node.
pub fn hierarchy_query(start_uri: &str, subclass_property_uri: &str) -> String {
    format!(
        r#"PREFIX wikibase: <http://wikiba.se/ontology#>
PREFIX bd: <http://www.bigdata.com/rdf#>
SELECT ?item ?itemLabel ?itemDescription
       ?subclass_of ?subclass_ofLabel ?subclass_ofDescription
       ?next_subclass ?next_subclassLabel ?next_subclassDescription
WHERE {{
  <{start_uri}> <{subclass_property_uri}>* ?item .
  ?item <{subclass_property_uri}> ?subclass_of .
  ?subclass_of <{subclass_property_uri}> ?next_subclass .
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "[AUTO_LANGUAGE],en". }}
}}"#
    )
}

/// Hierarchy rows from a SPARQL query service.
pub struct SparqlHierarchySource<E> {
    executor: E,
    subclass_property_uri: String,
}

impl<E: SparqlExecutor> SparqlHierarchySource<E> {
    pub fn new(executor: E, subclass_property_uri: impl Into<String>) -> Self {
        Self {
            executor,
            subclass_property_uri: subclass_property_uri.into(),
        }
    }
}

impl<E: SparqlExecutor> HierarchySource for SparqlHierarchySource<E> {
    fn subclass_edges(&self, start_uri: &str) -> Result<Vec<HierarchyEdge>, PathError> {
        let query = hierarchy_query(start_uri, &self.subclass_property_uri);
        let table = self
            .executor
            .select_table(&query)
            .map_err(|e| PathError::NoData {
                reason: e.to_string(),
            })?;
        let Some(table) = table else {
            return Ok(Vec::new());
        };
        table
            .rows
            .iter()
            .enumerate()
            .map(|(i, record)| HierarchyEdge::from_record(i, record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use wbmaker::sparql::{SparqlResults, SparqlTerm};
    use wbmaker::{Result as WbResult, WbError};

    struct Canned {
        body: Option<&'static str>,
        seen: RefCell<Vec<String>>,
    }

    impl SparqlExecutor for Canned {
        fn select_raw(&self, query: &str) -> WbResult<Option<SparqlResults>> {
            self.seen.borrow_mut().push(query.to_string());
            match self.body {
                Some(body) => Ok(Some(serde_json::from_str(body)?)),
                None => Err(WbError::Response {
                    service: "sparql",
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    const ROWS: &str = r#"{
        "head": {"vars": ["item", "itemLabel", "subclass_of", "subclass_ofLabel", "next_subclass"]},
        "results": {"bindings": [
            {"item": {"type": "uri", "value": "http://e/Q5"},
             "itemLabel": {"type": "literal", "value": "human"},
             "subclass_of": {"type": "uri", "value": "http://e/Q215627"},
             "subclass_ofLabel": {"type": "literal", "value": "person"},
             "next_subclass": {"type": "uri", "value": "http://e/Q35120"}}
        ]}
    }"#;

    #[test]
    fn test_query_is_parameterized_on_start() {
        let q = hierarchy_query("http://e/Q5", "http://p/P279");
        assert!(q.contains("<http://e/Q5> <http://p/P279>* ?item"));
        assert!(q.contains("?subclass_of <http://p/P279> ?next_subclass"));
        for col in [
            "?itemLabel",
            "?itemDescription",
            "?subclass_ofDescription",
            "?next_subclassLabel",
        ] {
            assert!(q.contains(col), "query selects {col}");
        }
    }

    #[test]
    fn test_query_declares_label_service_prefixes() {
        let q = hierarchy_query("http://e/Q5", "http://p/P279");
        assert!(q.starts_with("PREFIX wikibase: <http://wikiba.se/ontology#>\n"));
        assert!(q.contains("PREFIX bd: <http://www.bigdata.com/rdf#>\n"));
        assert!(q.contains("SERVICE wikibase:label"));
    }

    #[test]
    fn test_rows_are_decoded() {
        let canned = Canned {
            body: Some(ROWS),
            seen: RefCell::new(Vec::new()),
        };
        let source = SparqlHierarchySource::new(&canned, "http://p/P279");
        let edges = source.subclass_edges("http://e/Q5").unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].item, "http://e/Q5");
        assert_eq!(edges[0].item_label.as_deref(), Some("human"));
        assert_eq!(edges[0].next_subclass, "http://e/Q35120");
        assert_eq!(edges[0].next_subclass_label, None);
        assert_eq!(canned.seen.borrow().len(), 1);
    }

    #[test]
    fn test_transport_failure_is_no_data() {
        let canned = Canned {
            body: None,
            seen: RefCell::new(Vec::new()),
        };
        let source = SparqlHierarchySource::new(&canned, "http://p/P279");
        let err = source.subclass_edges("http://e/Q5").unwrap_err();
        assert!(matches!(err, PathError::NoData { .. }));
    }

    #[test]
    fn test_missing_identifier_column_is_malformed() {
        let mut record = SparqlRecord::new();
        record.insert("item".into(), Some("http://e/Q5".into()));
        record.insert("subclass_of".into(), None);
        let err = HierarchyEdge::from_record(3, &record).unwrap_err();
        assert!(matches!(
            err,
            PathError::Malformed { row: 3, column: "subclass_of" }
        ));
    }

    #[test]
    fn test_term_decoding_keeps_language() {
        let term: SparqlTerm =
            serde_json::from_str(r#"{"type": "literal", "value": "human", "xml:lang": "en"}"#)
                .unwrap();
        assert_eq!(term.lang.as_deref(), Some("en"));
    }
}
