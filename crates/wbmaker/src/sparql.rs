//! SPARQL endpoint access and result shaping.
//!
//! Every endpoint is treated the same way: a non-success status, an
//! undecodable body, or an empty binding set all mean "no data" (`None`).
//! Only transport failures surface as errors.

use crate::error::Result;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// W3C SPARQL 1.1 JSON results document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: SparqlHead,
    #[serde(default)]
    pub results: SparqlBindings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlBindings {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlTerm {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

/// One result row: every head variable, `None` when unbound.
pub type SparqlRecord = BTreeMap<String, Option<String>>;

/// Rows plus the column order announced in the result head.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SparqlTable {
    pub vars: Vec<String>,
    pub rows: Vec<SparqlRecord>,
}

impl SparqlResults {
    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }

    pub fn into_table(self) -> SparqlTable {
        let vars = self.head.vars;
        let rows = self
            .results
            .bindings
            .into_iter()
            .map(|mut binding| {
                vars.iter()
                    .map(|var| (var.clone(), binding.remove(var).map(|t| t.value)))
                    .collect()
            })
            .collect();
        SparqlTable { vars, rows }
    }
}

impl SparqlTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bound value of `var` in row `row`.
    pub fn value(&self, row: usize, var: &str) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(var))
            .and_then(|v| v.as_deref())
    }

    /// Map the second column to the identifier at the end of the first
    /// column's URI, e.g. `"instance of" -> "P31"`.
    ///
    /// Rows missing either column are skipped; later rows win.
    pub fn into_lookup(self) -> HashMap<String, String> {
        let (Some(id_var), Some(key_var)) = (self.vars.first(), self.vars.get(1)) else {
            return HashMap::new();
        };
        let mut out = HashMap::new();
        for row in &self.rows {
            let id = row.get(id_var).and_then(|v| v.as_deref());
            let key = row.get(key_var).and_then(|v| v.as_deref());
            if let (Some(id), Some(key)) = (id, key) {
                out.insert(key.to_string(), entity_id_from_uri(id).to_string());
            }
        }
        out
    }
}

/// Last `/`-separated segment of an entity URI (`.../entity/Q42` -> `Q42`).
pub fn entity_id_from_uri(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

/// Interpret an endpoint response. Anything but a 200 with a non-empty,
/// well-formed result set is "no data".
pub fn decode_response(status: StatusCode, body: &str) -> Option<SparqlResults> {
    if status != StatusCode::OK {
        tracing::warn!(%status, "SPARQL endpoint returned a non-success status");
        return None;
    }
    let results: SparqlResults = match serde_json::from_str(body) {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(error = %e, "SPARQL endpoint returned undecodable JSON");
            return None;
        }
    };
    if results.is_empty() {
        tracing::debug!("SPARQL query returned no bindings");
        return None;
    }
    Some(results)
}

/// Something that can answer a SPARQL SELECT.
pub trait SparqlExecutor {
    fn select_raw(&self, query: &str) -> Result<Option<SparqlResults>>;

    fn select_table(&self, query: &str) -> Result<Option<SparqlTable>> {
        Ok(self.select_raw(query)?.map(SparqlResults::into_table))
    }

    fn select_records(&self, query: &str) -> Result<Option<Vec<SparqlRecord>>> {
        Ok(self.select_table(query)?.map(|t| t.rows))
    }

    fn select_lookup(&self, query: &str) -> Result<Option<HashMap<String, String>>> {
        Ok(self.select_table(query)?.map(SparqlTable::into_lookup))
    }
}

impl<T: SparqlExecutor + ?Sized> SparqlExecutor for &T {
    fn select_raw(&self, query: &str) -> Result<Option<SparqlResults>> {
        (**self).select_raw(query)
    }
}

/// Blocking HTTP client for one SPARQL endpoint.
#[derive(Debug, Clone)]
pub struct SparqlClient {
    client: Client,
    endpoint: String,
}

impl SparqlClient {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Same HTTP client, different endpoint.
    pub fn with_endpoint(&self, endpoint: &str) -> Self {
        Self {
            client: self.client.clone(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SparqlExecutor for SparqlClient {
    fn select_raw(&self, query: &str) -> Result<Option<SparqlResults>> {
        tracing::debug!(endpoint = %self.endpoint, "SPARQL query: {query}");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("format", "json"), ("query", query)])
            .send()?;
        let status = response.status();
        let body = response.text()?;
        Ok(decode_response(status, &body))
    }
}
