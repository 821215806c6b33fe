//! The `Wb` facade: one configured Wikibase instance.

use crate::config::WbConfig;
use crate::error::{Result, WbError};
use crate::item::{ItemBuilder, ItemData, ItemDocument, PropertyInfo, PropertyResolver};
use crate::mediawiki::MediaWikiClient;
use crate::sparql::{entity_id_from_uri, SparqlClient, SparqlExecutor, SparqlTable};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

const PROPERTY_MAP_QUERY: &str = r#"
PREFIX wikibase: <http://wikiba.se/ontology#>
PREFIX bd: <http://www.bigdata.com/rdf#>
SELECT ?property ?propertyLabel ?propertyType WHERE {
  ?property a wikibase:Property ;
            wikibase:propertyType ?propertyType .
  SERVICE wikibase:label { bd:serviceParam wikibase:language "[AUTO_LANGUAGE],en". }
}
"#;

/// Day-precision Wikibase time string: `+2024-01-15T00:00:00Z`.
pub fn wb_time(date: NaiveDate) -> String {
    format!("+{}T00:00:00Z", date.format("%Y-%m-%d"))
}

/// Normalise `2024-01-15`, `2024-01-15T10:00:00Z` or `+2024-01-15T00:00:00Z`
/// to a day-precision Wikibase time string.
pub fn normalize_time(value: &str) -> Option<String> {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);
    let date_part = value.split('T').next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(wb_time)
}

/// Today's date as a Wikibase time string.
pub fn wb_today() -> String {
    wb_time(chrono::Utc::now().date_naive())
}

/// Label -> property id/datatype for every labelled property. Datatypes
/// that cannot be written are kept and rejected only when a value is built.
pub fn property_map_from_table(table: &SparqlTable) -> HashMap<String, PropertyInfo> {
    let mut props = HashMap::new();
    for row in &table.rows {
        let get = |var: &str| row.get(var).and_then(|v| v.as_deref());
        let (Some(uri), Some(label)) = (get("property"), get("propertyLabel")) else {
            continue;
        };
        let datatype = get("propertyType").unwrap_or_default();
        props.insert(
            label.to_string(),
            PropertyInfo::new(entity_id_from_uri(uri), datatype),
        );
    }
    props
}

/// `P` followed by digits.
pub fn is_property_id(name: &str) -> bool {
    name.strip_prefix('P')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Look `name` up in `props`; a property id missing from the map is asked
/// of `by_id` instead.
pub fn resolve_property<F>(props: &HashMap<String, PropertyInfo>, name: &str, by_id: F) -> Result<PropertyInfo>
where
    F: FnOnce(&str) -> Result<PropertyInfo>,
{
    match props.resolve(name) {
        Err(WbError::UnknownProperty(_)) if is_property_id(name) => by_id(name),
        other => other,
    }
}

pub struct Wb {
    config: WbConfig,
    sparql: SparqlClient,
    public_sparql: SparqlClient,
    mediawiki: MediaWikiClient,
    public_mediawiki: MediaWikiClient,
    props: OnceLock<HashMap<String, PropertyInfo>>,
}

impl Wb {
    /// Build clients for `config`. With `cache_props` the property map is
    /// fetched now; otherwise on first use.
    pub fn new(config: WbConfig, cache_props: bool) -> Result<Self> {
        let timeout = config.timeout();
        let sparql = SparqlClient::new(&config.sparql_endpoint, &config.bot_user_agent, timeout)?;
        let public_sparql = sparql.with_endpoint(config.public_sparql_endpoint());
        let mediawiki = MediaWikiClient::new(
            &config.mediawiki_api_url,
            &config.wikibase_url,
            &config.bot_user_agent,
            timeout,
        )?;
        let public_mediawiki = MediaWikiClient::new(
            &config.public_mediawiki_api_url(),
            config.public_wikibase_url(),
            &config.bot_user_agent,
            timeout,
        )?;
        let wb = Self {
            config,
            sparql,
            public_sparql,
            mediawiki,
            public_mediawiki,
            props: OnceLock::new(),
        };
        if cache_props {
            wb.props()?;
        }
        Ok(wb)
    }

    pub fn from_config_file(path: impl AsRef<Path>, section: &str, cache_props: bool) -> Result<Self> {
        let config = WbConfig::load(path, section)?;
        Self::new(config, cache_props)
    }

    pub fn config(&self) -> &WbConfig {
        &self.config
    }

    pub fn sparql(&self) -> &SparqlClient {
        &self.sparql
    }

    /// Client for the public query service used by template filling.
    pub fn public_sparql(&self) -> &SparqlClient {
        &self.public_sparql
    }

    pub fn mediawiki(&self) -> &MediaWikiClient {
        &self.mediawiki
    }

    /// Wiki serving entity data for template filling.
    pub fn public_mediawiki(&self) -> &MediaWikiClient {
        &self.public_mediawiki
    }

    pub fn domain(&self) -> Option<String> {
        self.config.domain()
    }

    /// Fetch the property map from the instance's query service.
    pub fn property_map(&self) -> Result<HashMap<String, PropertyInfo>> {
        let table = self
            .sparql
            .select_table(PROPERTY_MAP_QUERY)?
            .unwrap_or_default();
        let props = property_map_from_table(&table);
        tracing::info!(count = props.len(), "loaded property map");
        Ok(props)
    }

    /// Cached property map.
    pub fn props(&self) -> Result<&HashMap<String, PropertyInfo>> {
        if let Some(props) = self.props.get() {
            return Ok(props);
        }
        let props = self.property_map()?;
        Ok(self.props.get_or_init(|| props))
    }

    /// Id and datatype of a property, asked of the wiki directly.
    pub fn property_info(&self, pid: &str) -> Result<PropertyInfo> {
        let datatype = self
            .mediawiki
            .property_datatype(pid)?
            .ok_or_else(|| WbError::UnknownProperty(pid.to_string()))?;
        tracing::debug!(pid, %datatype, "property resolved by id");
        Ok(PropertyInfo::new(pid, datatype))
    }

    pub fn get_item(&self, qid: &str) -> Result<Option<ItemDocument>> {
        self.mediawiki
            .get_entity(qid)?
            .map(ItemDocument::from_entity_json)
            .transpose()
    }

    /// Build the edit document for `data`, starting from the live item when
    /// `data.qid` names one.
    pub fn build_item(&self, data: &ItemData) -> Result<ItemDocument> {
        let existing = match data.qid.as_deref().filter(|q| !q.is_empty()) {
            Some(qid) => Some(
                self.get_item(qid)?
                    .ok_or_else(|| WbError::Response {
                        service: "wikibase",
                        message: format!("item {qid} does not exist"),
                    })?,
            ),
            None => None,
        };
        ItemBuilder::new(self).build(data, existing)
    }
}

/// Labels come from the property map; bare ids (`P31`) not in it are
/// looked up on the wiki.
impl PropertyResolver for Wb {
    fn resolve(&self, name: &str) -> Result<PropertyInfo> {
        resolve_property(self.props()?, name, |pid| self.property_info(pid))
    }
}
