//! Filling wiki templates (infoboxes) with Wikidata values.
//!
//! Two routes produce template parameters for an item:
//! - a SPARQL query returning `?param ?value` rows, or
//! - a direct `parameter -> property id` mapping over the item's entity data.
//!
//! Either way the result is rendered as a wikitext template call.

use crate::error::Result;
use crate::item::snak_value;
use crate::mediawiki::MediaWikiClient;
use crate::sparql::{SparqlExecutor, SparqlResults};
use crate::wb::Wb;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Map, Value};

const TEMPLATE_NAMESPACE: &str = "Template:";
const TEMPLATE_KEY: &str = "template";

/// Ordered template parameters; re-inserting a name keeps its position and
/// replaces the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateParams(Vec<(String, String)>);

impl TemplateParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(n, v)| (n.to_string(), Value::String(v.to_string())))
                .collect::<Map<_, _>>(),
        )
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for TemplateParams {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = TemplateParams::new();
        for (n, v) in iter {
            params.insert(n, v);
        }
        params
    }
}

/// Substitute `{qid}` into a query template; `{{` and `}}` are literal braces.
pub fn substitute_qid(template: &str, qid: &str) -> String {
    let mut out = String::with_capacity(template.len() + qid.len());
    let mut rest = template;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("{{") {
            out.push('{');
            rest = &rest[2..];
        } else if rest.starts_with("}}") {
            out.push('}');
            rest = &rest[2..];
        } else if rest.starts_with("{qid}") {
            out.push_str(qid);
            rest = &rest["{qid}".len()..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

/// `param`/`value` bindings as template parameters; later rows win.
pub fn template_params_from_results(results: &SparqlResults) -> Option<TemplateParams> {
    let mut params = TemplateParams::new();
    for binding in &results.results.bindings {
        if let (Some(param), Some(value)) = (binding.get("param"), binding.get("value")) {
            params.insert(param.value.clone(), value.value.clone());
        }
    }
    (!params.is_empty()).then_some(params)
}

/// First value of each mapped property of `qid` in `Special:EntityData` JSON.
pub fn params_from_entity_data(
    data: &Value,
    qid: &str,
    mapping: &[(String, String)],
) -> Option<TemplateParams> {
    let claims = data.get("entities")?.get(qid)?.get("claims");
    let mut params = TemplateParams::new();
    for (param, pid) in mapping {
        let first = claims
            .and_then(|c| c.get(pid))
            .and_then(Value::as_array)
            .and_then(|statements| statements.first());
        if let Some(value) = first.and_then(|s| s.get("mainsnak")).and_then(snak_value) {
            params.insert(param.clone(), value);
        }
    }
    (!params.is_empty()).then_some(params)
}

/// `{{name\n|k=v\n...\n}}`
pub fn create_wikitext_template(template_name: &str, params: &TemplateParams) -> String {
    let mut lines = vec![format!("{{{{{template_name}")];
    lines.extend(params.iter().map(|(n, v)| format!("|{n}={v}")));
    lines.push("}}".to_string());
    lines.join("\n")
}

/// A compiled text template rendered with `{{name}}` placeholders.
/// Output is not HTML-escaped.
pub struct WikiTemplate {
    registry: Handlebars<'static>,
}

impl WikiTemplate {
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        Ok(self.registry.render(TEMPLATE_KEY, data)?)
    }
}

pub fn load_template(content: &str) -> Result<WikiTemplate> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry.register_template_string(TEMPLATE_KEY, content)?;
    Ok(WikiTemplate { registry })
}

/// Entity data and page text of a wiki.
pub trait WikiSource {
    fn entity_data(&self, id: &str) -> Result<Option<Value>>;
    fn page_text(&self, title: &str) -> Result<Option<String>>;
}

impl WikiSource for MediaWikiClient {
    fn entity_data(&self, id: &str) -> Result<Option<Value>> {
        MediaWikiClient::entity_data(self, id)
    }

    fn page_text(&self, title: &str) -> Result<Option<String>> {
        MediaWikiClient::page_text(self, title)
    }
}

/// Item values come from the public query service and entity data;
/// template pages come from the configured wiki.
pub struct DataToInfo<'a> {
    sparql: &'a dyn SparqlExecutor,
    entities: &'a dyn WikiSource,
    pages: &'a dyn WikiSource,
}

impl<'a> DataToInfo<'a> {
    pub fn new(wb: &'a Wb) -> Self {
        Self {
            sparql: wb.public_sparql(),
            entities: wb.public_mediawiki(),
            pages: wb.mediawiki(),
        }
    }

    /// One wiki for both entity data and pages.
    pub fn with_sources(sparql: &'a dyn SparqlExecutor, wiki: &'a dyn WikiSource) -> Self {
        Self {
            sparql,
            entities: wiki,
            pages: wiki,
        }
    }

    pub fn with_entity_source(mut self, entities: &'a dyn WikiSource) -> Self {
        self.entities = entities;
        self
    }

    pub fn get_wikidata_item(&self, qid: &str) -> Result<Option<Value>> {
        self.entities.entity_data(qid)
    }

    /// Run `sparql_template` for `qid`; the query must select `?param` and
    /// `?value`.
    pub fn sparql_to_template_params(
        &self,
        qid: &str,
        sparql_template: &str,
    ) -> Result<Option<TemplateParams>> {
        let query = substitute_qid(sparql_template, qid);
        Ok(self
            .sparql
            .select_raw(&query)?
            .as_ref()
            .and_then(template_params_from_results))
    }

    /// Wikitext of `Template:{name}`; a leading `Template:` is accepted.
    pub fn get_wikipedia_template(&self, template_name: &str) -> Result<Option<String>> {
        let name = template_name
            .strip_prefix(TEMPLATE_NAMESPACE)
            .unwrap_or(template_name);
        self.pages.page_text(&format!("{TEMPLATE_NAMESPACE}{name}"))
    }

    pub fn fill_template_from_sparql(
        &self,
        qid: &str,
        template_name: &str,
        sparql_template: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .sparql_to_template_params(qid, sparql_template)?
            .map(|params| create_wikitext_template(template_name, &params)))
    }

    /// Only the first value of each property is used.
    pub fn fill_template_from_item_data(
        &self,
        qid: &str,
        template_name: &str,
        property_mapping: &[(String, String)],
    ) -> Result<Option<String>> {
        let Some(data) = self.get_wikidata_item(qid)? else {
            return Ok(None);
        };
        Ok(params_from_entity_data(&data, qid, property_mapping)
            .map(|params| create_wikitext_template(template_name, &params)))
    }
}
