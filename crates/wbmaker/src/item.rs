//! Item documents: labels, aliases, descriptions and statements with
//! qualifiers and references.
//!
//! Input is an [`ItemData`] description keyed by property *labels*; the
//! builder resolves labels to property ids and datatypes, turns values into
//! Wikibase snaks and merges them into an existing entity (or a new one).
//! The result is a `wbeditentity`-shaped document; submitting it is left to
//! the caller.

use crate::error::{Result, WbError};
use crate::wb::normalize_time;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

pub const SPECIAL_UNKNOWN_VALUE: &str = "SPECIAL:UNKNOWN_VALUE";
pub const SPECIAL_NO_VALUE: &str = "SPECIAL:NO_VALUE";

pub const DEFAULT_LANGUAGE: &str = "en";
pub const MAX_DESCRIPTION_CHARS: usize = 250;

const GREGORIAN_CALENDAR: &str = "http://www.wikidata.org/entity/Q1985727";
const DAY_PRECISION: u8 = 11;

// ============================================================================
// Property datatypes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    Item,
    Url,
    ExternalId,
    String,
    MonolingualText,
    Time,
    Quantity,
}

impl Datatype {
    /// Datatype id as used in snak JSON.
    pub fn id(&self) -> &'static str {
        match self {
            Datatype::Item => "wikibase-item",
            Datatype::Url => "url",
            Datatype::ExternalId => "external-id",
            Datatype::String => "string",
            Datatype::MonolingualText => "monolingualtext",
            Datatype::Time => "time",
            Datatype::Quantity => "quantity",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Datatype {
    type Err = WbError;

    /// Accepts datatype ids (`wikibase-item`), ontology names (`WikibaseItem`)
    /// and ontology URIs (`http://wikiba.se/ontology#WikibaseItem`).
    fn from_str(s: &str) -> Result<Self> {
        let name = s.rsplit('#').next().unwrap_or(s);
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "wikibaseitem" | "item" => Ok(Datatype::Item),
            "url" => Ok(Datatype::Url),
            "externalid" => Ok(Datatype::ExternalId),
            "string" => Ok(Datatype::String),
            "monolingualtext" => Ok(Datatype::MonolingualText),
            "time" => Ok(Datatype::Time),
            "quantity" => Ok(Datatype::Quantity),
            _ => Err(WbError::UnsupportedDatatype(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub pid: String,
    /// Datatype as the instance reports it; supported ones use the
    /// snak datatype id (`wikibase-item`), others keep their ontology
    /// name (`GlobeCoordinate`).
    pub datatype: String,
}

impl PropertyInfo {
    pub fn new(pid: impl Into<String>, datatype: impl fmt::Display) -> Self {
        let raw = datatype.to_string();
        let datatype = match raw.parse::<Datatype>() {
            Ok(known) => known.id().to_string(),
            Err(_) => raw.rsplit('#').next().unwrap_or(&raw).to_string(),
        };
        Self {
            pid: pid.into(),
            datatype,
        }
    }

    /// Writable datatype, or `UnsupportedDatatype`.
    pub fn kind(&self) -> Result<Datatype> {
        self.datatype.parse()
    }
}

/// Resolves a property label (`"instance of"`) to its id and datatype.
pub trait PropertyResolver {
    fn resolve(&self, name: &str) -> Result<PropertyInfo>;
}

impl PropertyResolver for HashMap<String, PropertyInfo> {
    fn resolve(&self, name: &str) -> Result<PropertyInfo> {
        self.get(name)
            .cloned()
            .ok_or_else(|| WbError::UnknownProperty(name.to_string()))
    }
}

// ============================================================================
// Input description
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(v) => vec![v.clone()],
            OneOrMany::Many(vs) => vs.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    #[serde(default)]
    pub qid: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: OneOrMany,
    #[serde(default)]
    pub claims: Vec<ClaimData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimData {
    pub property_name: String,
    pub value: String,
    #[serde(default)]
    pub qualifiers: Vec<SnakGroupData>,
    #[serde(default)]
    pub references: Vec<SnakGroupData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakGroupData {
    pub property_name: String,
    pub values: OneOrMany,
    #[serde(default = "default_replace")]
    pub replace: bool,
}

fn default_replace() -> bool {
    true
}

/// Blank input document showing every supported field.
pub fn item_data_template() -> ItemData {
    let group = SnakGroupData {
        property_name: String::new(),
        values: OneOrMany::Many(vec![String::new()]),
        replace: true,
    };
    ItemData {
        qid: Some(String::new()),
        label: Some(String::new()),
        description: Some(String::new()),
        aliases: OneOrMany::Many(vec![String::new()]),
        claims: vec![ClaimData {
            property_name: String::new(),
            value: String::new(),
            qualifiers: vec![group.clone()],
            references: vec![group],
        }],
    }
}

// ============================================================================
// Snaks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnakValue {
    Value(String),
    Unknown,
    NoValue,
}

impl SnakValue {
    fn snaktype(&self) -> &'static str {
        match self {
            SnakValue::Value(_) => "value",
            SnakValue::Unknown => "somevalue",
            SnakValue::NoValue => "novalue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snak {
    pub property: String,
    pub datatype: Datatype,
    pub value: SnakValue,
}

impl Snak {
    /// Build a snak from a raw input value, normalising times and quantities.
    pub fn new(info: &PropertyInfo, raw: &str) -> Result<Self> {
        let datatype = info.kind()?;
        let invalid = || WbError::InvalidValue {
            pid: info.pid.clone(),
            datatype: info.datatype.clone(),
            value: raw.to_string(),
        };
        let value = match raw {
            SPECIAL_UNKNOWN_VALUE => SnakValue::Unknown,
            SPECIAL_NO_VALUE => SnakValue::NoValue,
            special if special.starts_with("SPECIAL:") => return Err(invalid()),
            raw => SnakValue::Value(match datatype {
                Datatype::Time => normalize_time(raw).ok_or_else(invalid)?,
                Datatype::Quantity => {
                    let amount: i64 = raw.trim().parse().map_err(|_| invalid())?;
                    format!("{amount:+}")
                }
                Datatype::Item => {
                    let id = raw.trim();
                    if entity_numeric_id(id).is_none() {
                        return Err(invalid());
                    }
                    id.to_string()
                }
                _ => raw.to_string(),
            }),
        };
        Ok(Self {
            property: info.pid.clone(),
            datatype,
            value,
        })
    }

    fn datavalue(&self, value: &str) -> Value {
        match self.datatype {
            Datatype::Item => {
                let entity_type = if value.starts_with('P') { "property" } else { "item" };
                json!({
                    "type": "wikibase-entityid",
                    "value": {
                        "entity-type": entity_type,
                        "numeric-id": entity_numeric_id(value),
                        "id": value,
                    }
                })
            }
            Datatype::Url | Datatype::ExternalId | Datatype::String => {
                json!({ "type": "string", "value": value })
            }
            Datatype::MonolingualText => json!({
                "type": "monolingualtext",
                "value": { "text": value, "language": DEFAULT_LANGUAGE }
            }),
            Datatype::Time => json!({
                "type": "time",
                "value": {
                    "time": value,
                    "timezone": 0,
                    "before": 0,
                    "after": 0,
                    "precision": DAY_PRECISION,
                    "calendarmodel": GREGORIAN_CALENDAR,
                }
            }),
            Datatype::Quantity => json!({
                "type": "quantity",
                "value": { "amount": value, "unit": "1" }
            }),
        }
    }

    /// Wikibase snak JSON.
    pub fn to_json(&self) -> Value {
        let mut snak = json!({
            "snaktype": self.value.snaktype(),
            "property": self.property,
            "datatype": self.datatype.id(),
        });
        if let SnakValue::Value(v) = &self.value {
            snak["datavalue"] = self.datavalue(v);
        }
        snak
    }

    /// Whether an existing snak JSON carries the same value as this one.
    pub fn matches(&self, snak: &Value) -> bool {
        match &self.value {
            SnakValue::Value(v) => snak_value(snak).as_deref() == Some(v.as_str()),
            other => snak.get("snaktype").and_then(Value::as_str) == Some(other.snaktype()),
        }
    }
}

fn entity_numeric_id(id: &str) -> Option<u64> {
    let rest = id.strip_prefix('Q').or_else(|| id.strip_prefix('P'))?;
    rest.parse().ok()
}

/// Main value of a snak: the string itself, or the first of `id`, `text`,
/// `time`, `amount` when the value is an object.
pub fn snak_value(snak: &Value) -> Option<String> {
    let value = snak.get("datavalue")?.get("value")?;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => ["id", "text", "time", "amount"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str).map(str::to_string)),
        _ => None,
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Wikibase serialises empty maps as `[]`; accept both shapes.
fn map_or_empty_array<'de, D, T>(deserializer: D) -> std::result::Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrSeq<T> {
        Map(BTreeMap<String, T>),
        Seq(Vec<Value>),
    }
    match MapOrSeq::<T>::deserialize(deserializer)? {
        MapOrSeq::Map(m) => Ok(m),
        MapOrSeq::Seq(_) => Ok(BTreeMap::new()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangValue {
    pub language: String,
    pub value: String,
}

impl LangValue {
    fn en(value: &str) -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "map_or_empty_array")]
    pub snaks: BTreeMap<String, Vec<Value>>,
    #[serde(rename = "snaks-order", default)]
    pub snaks_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub mainsnak: Value,
    #[serde(rename = "type", default = "statement_type")]
    pub kind: String,
    #[serde(default = "normal_rank")]
    pub rank: String,
    #[serde(default, deserialize_with = "map_or_empty_array", skip_serializing_if = "BTreeMap::is_empty")]
    pub qualifiers: BTreeMap<String, Vec<Value>>,
    #[serde(rename = "qualifiers-order", default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
}

fn statement_type() -> String {
    "statement".to_string()
}

fn normal_rank() -> String {
    "normal".to_string()
}

impl Statement {
    pub fn new(mainsnak: &Snak) -> Self {
        Self {
            id: None,
            mainsnak: mainsnak.to_json(),
            kind: statement_type(),
            rank: normal_rank(),
            qualifiers: BTreeMap::new(),
            qualifiers_order: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn main_value(&self) -> Option<String> {
        snak_value(&self.mainsnak)
    }

    pub fn remove_qualifiers(&mut self, pid: &str) {
        self.qualifiers.remove(pid);
        self.qualifiers_order.retain(|p| p != pid);
    }

    pub fn add_qualifier(&mut self, snak: &Snak) {
        if !self.qualifiers_order.contains(&snak.property) {
            self.qualifiers_order.push(snak.property.clone());
        }
        self.qualifiers
            .entry(snak.property.clone())
            .or_default()
            .push(snak.to_json());
    }

    /// Drop `pid` snaks from every reference; references left empty go away.
    pub fn remove_reference_snaks(&mut self, pid: &str) {
        for reference in &mut self.references {
            if reference.snaks.remove(pid).is_some() {
                reference.snaks_order.retain(|p| p != pid);
                reference.hash = None;
            }
        }
        self.references.retain(|r| !r.snaks.is_empty());
    }

    pub fn add_reference(&mut self, snaks: &[Snak]) {
        if snaks.is_empty() {
            return;
        }
        let mut reference = Reference {
            hash: None,
            snaks: BTreeMap::new(),
            snaks_order: Vec::new(),
        };
        for snak in snaks {
            if !reference.snaks_order.contains(&snak.property) {
                reference.snaks_order.push(snak.property.clone());
            }
            reference
                .snaks
                .entry(snak.property.clone())
                .or_default()
                .push(snak.to_json());
        }
        self.references.push(reference);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "map_or_empty_array")]
    pub labels: BTreeMap<String, LangValue>,
    #[serde(default, deserialize_with = "map_or_empty_array")]
    pub descriptions: BTreeMap<String, LangValue>,
    #[serde(default, deserialize_with = "map_or_empty_array")]
    pub aliases: BTreeMap<String, Vec<LangValue>>,
    #[serde(default, deserialize_with = "map_or_empty_array")]
    pub claims: BTreeMap<String, Vec<Statement>>,
    /// Everything else the API returned (sitelinks, lastrevid, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ItemDocument {
    fn default() -> Self {
        Self {
            id: None,
            labels: BTreeMap::new(),
            descriptions: BTreeMap::new(),
            aliases: BTreeMap::new(),
            claims: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl ItemDocument {
    pub fn from_entity_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels.get(language).map(|l| l.value.as_str())
    }

    pub fn description(&self, language: &str) -> Option<&str> {
        self.descriptions.get(language).map(|l| l.value.as_str())
    }

    pub fn statements(&self, pid: &str) -> &[Statement] {
        self.claims.get(pid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The `data` argument of `wbeditentity`.
    pub fn edit_payload(&self) -> Result<Value> {
        let mut payload = json!({
            "labels": serde_json::to_value(&self.labels)?,
            "descriptions": serde_json::to_value(&self.descriptions)?,
            "aliases": serde_json::to_value(&self.aliases)?,
            "claims": serde_json::to_value(&self.claims)?,
        });
        if let Some(sitelinks) = self.extra.get("sitelinks") {
            payload["sitelinks"] = sitelinks.clone();
        }
        Ok(payload)
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone)]
struct PreparedGroup {
    pid: String,
    replace: bool,
    snaks: Vec<Snak>,
}

#[derive(Debug, Clone)]
struct PreparedClaim {
    mainsnak: Snak,
    qualifiers: Vec<PreparedGroup>,
    references: Vec<PreparedGroup>,
}

fn prepare_group(group: &SnakGroupData, resolver: &dyn PropertyResolver) -> Result<PreparedGroup> {
    let info = resolver.resolve(&group.property_name)?;
    let snaks = group
        .values
        .to_vec()
        .iter()
        .map(|v| Snak::new(&info, v))
        .collect::<Result<Vec<_>>>()?;
    Ok(PreparedGroup {
        pid: info.pid,
        replace: group.replace,
        snaks,
    })
}

fn prepare_claim(claim: &ClaimData, resolver: &dyn PropertyResolver) -> Result<PreparedClaim> {
    let info = resolver.resolve(&claim.property_name)?;
    Ok(PreparedClaim {
        mainsnak: Snak::new(&info, &claim.value)?,
        qualifiers: claim
            .qualifiers
            .iter()
            .map(|g| prepare_group(g, resolver))
            .collect::<Result<_>>()?,
        references: claim
            .references
            .iter()
            .map(|g| prepare_group(g, resolver))
            .collect::<Result<_>>()?,
    })
}

pub struct ItemBuilder<'a> {
    resolver: &'a dyn PropertyResolver,
}

impl<'a> ItemBuilder<'a> {
    pub fn new(resolver: &'a dyn PropertyResolver) -> Self {
        Self { resolver }
    }

    /// Apply `data` on top of `existing` (or a new item).
    ///
    /// All properties are resolved and all values validated before the
    /// document is touched, so a failure leaves nothing half-applied.
    pub fn build(&self, data: &ItemData, existing: Option<ItemDocument>) -> Result<ItemDocument> {
        let claims = data
            .claims
            .iter()
            .map(|c| prepare_claim(c, self.resolver))
            .collect::<Result<Vec<_>>>()?;

        let mut doc = existing.unwrap_or_default();
        if doc.id.is_none() {
            doc.id = data.qid.clone().filter(|q| !q.is_empty());
        }

        if let Some(label) = data.label.as_deref().filter(|l| !l.is_empty()) {
            doc.labels.insert(DEFAULT_LANGUAGE.to_string(), LangValue::en(label));
        }

        let aliases: Vec<String> = data
            .aliases
            .to_vec()
            .into_iter()
            .filter(|a| !a.is_empty())
            .collect();
        if !aliases.is_empty() {
            doc.aliases.insert(
                DEFAULT_LANGUAGE.to_string(),
                aliases.iter().map(|a| LangValue::en(a)).collect(),
            );
        }

        if let Some(description) = data.description.as_deref().filter(|d| !d.is_empty()) {
            let truncated: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
            doc.descriptions
                .insert(DEFAULT_LANGUAGE.to_string(), LangValue::en(&truncated));
        }

        for claim in claims {
            apply_claim(&mut doc, claim);
        }
        Ok(doc)
    }
}

fn apply_claim(doc: &mut ItemDocument, claim: PreparedClaim) {
    let statements = doc.claims.entry(claim.mainsnak.property.clone()).or_default();
    let position = statements
        .iter()
        .position(|s| claim.mainsnak.matches(&s.mainsnak));
    let statement = match position {
        Some(i) => &mut statements[i],
        None => {
            tracing::debug!(pid = %claim.mainsnak.property, "adding new statement");
            statements.push(Statement::new(&claim.mainsnak));
            let last = statements.len() - 1;
            &mut statements[last]
        }
    };

    for group in &claim.qualifiers {
        if group.replace {
            statement.remove_qualifiers(&group.pid);
        }
        for snak in &group.snaks {
            statement.add_qualifier(snak);
        }
    }
    for group in &claim.references {
        if group.replace {
            statement.remove_reference_snaks(&group.pid);
        }
        statement.add_reference(&group.snaks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> HashMap<String, PropertyInfo> {
        let mut props = HashMap::new();
        for (name, pid, datatype) in [
            ("instance of", "P31", Datatype::Item),
            ("reference URL", "P854", Datatype::Url),
            ("start time", "P580", Datatype::Time),
            ("number of parts", "P1110", Datatype::Quantity),
            ("title", "P1476", Datatype::MonolingualText),
        ] {
            props.insert(name.to_string(), PropertyInfo::new(pid, datatype));
        }
        props
    }

    fn claim(property_name: &str, value: &str) -> ClaimData {
        ClaimData {
            property_name: property_name.to_string(),
            value: value.to_string(),
            qualifiers: vec![],
            references: vec![],
        }
    }

    #[test]
    fn test_datatype_parsing() {
        assert_eq!("wikibase-item".parse::<Datatype>().unwrap(), Datatype::Item);
        assert_eq!("WikibaseItem".parse::<Datatype>().unwrap(), Datatype::Item);
        assert_eq!(
            "http://wikiba.se/ontology#ExternalId".parse::<Datatype>().unwrap(),
            Datatype::ExternalId
        );
        assert_eq!("QUANTITY".parse::<Datatype>().unwrap(), Datatype::Quantity);
        assert!(matches!(
            "geo-shape".parse::<Datatype>(),
            Err(WbError::UnsupportedDatatype(_))
        ));
    }

    #[test]
    fn test_property_info_keeps_unsupported_datatypes() {
        let info = PropertyInfo::new("P625", "http://wikiba.se/ontology#GlobeCoordinate");
        assert_eq!(info.datatype, "GlobeCoordinate");
        assert!(matches!(info.kind(), Err(WbError::UnsupportedDatatype(_))));

        let item = PropertyInfo::new("P31", "http://wikiba.se/ontology#WikibaseItem");
        assert_eq!(item.datatype, "wikibase-item");
        assert_eq!(item, PropertyInfo::new("P31", Datatype::Item));
    }

    #[test]
    fn test_claim_on_unsupported_datatype_is_rejected_on_use() {
        let mut props = resolver();
        props.insert(
            "coordinate location".to_string(),
            PropertyInfo::new("P625", "http://wikiba.se/ontology#GlobeCoordinate"),
        );
        let data = ItemData {
            label: Some("Somewhere".into()),
            claims: vec![claim("coordinate location", "52.5,13.4")],
            ..ItemData::default()
        };
        let err = ItemBuilder::new(&props).build(&data, None).unwrap_err();
        assert!(matches!(err, WbError::UnsupportedDatatype(d) if d == "GlobeCoordinate"));

        // Other properties of the same map stay usable.
        let ok = ItemData {
            claims: vec![claim("instance of", "Q5")],
            ..ItemData::default()
        };
        assert!(ItemBuilder::new(&props).build(&ok, None).is_ok());
    }

    #[test]
    fn test_special_values_become_snaktypes() {
        let info = resolver().resolve("instance of").unwrap();
        let unknown = Snak::new(&info, SPECIAL_UNKNOWN_VALUE).unwrap().to_json();
        assert_eq!(unknown["snaktype"], "somevalue");
        assert!(unknown.get("datavalue").is_none());
        let none = Snak::new(&info, SPECIAL_NO_VALUE).unwrap().to_json();
        assert_eq!(none["snaktype"], "novalue");
        assert!(Snak::new(&info, "SPECIAL:SOMETHING").is_err());
    }

    #[test]
    fn test_value_normalisation() {
        let props = resolver();
        let time = Snak::new(&props.resolve("start time").unwrap(), "2024-01-15").unwrap();
        assert_eq!(time.value, SnakValue::Value("+2024-01-15T00:00:00Z".to_string()));

        let qty = Snak::new(&props.resolve("number of parts").unwrap(), "12").unwrap();
        assert_eq!(qty.to_json()["datavalue"]["value"]["amount"], "+12");
        assert!(Snak::new(&props.resolve("number of parts").unwrap(), "twelve").is_err());

        let item = Snak::new(&props.resolve("instance of").unwrap(), "Q5").unwrap();
        let json = item.to_json();
        assert_eq!(json["datavalue"]["value"]["numeric-id"], 5);
        assert_eq!(json["datavalue"]["type"], "wikibase-entityid");
        assert!(Snak::new(&props.resolve("instance of").unwrap(), "human").is_err());
    }

    #[test]
    fn test_new_item_gets_label_aliases_description() {
        let props = resolver();
        let data = ItemData {
            label: Some("Test Item".to_string()),
            description: Some("x".repeat(300)),
            aliases: OneOrMany::One("SingleAlias".to_string()),
            ..ItemData::default()
        };
        let doc = ItemBuilder::new(&props).build(&data, None).unwrap();
        assert_eq!(doc.label("en"), Some("Test Item"));
        assert_eq!(doc.description("en").unwrap().chars().count(), MAX_DESCRIPTION_CHARS);
        assert_eq!(doc.aliases["en"].len(), 1);
        assert_eq!(doc.aliases["en"][0].value, "SingleAlias");
        assert!(doc.id.is_none());
    }

    #[test]
    fn test_matching_claim_is_updated_not_duplicated() {
        let props = resolver();
        let builder = ItemBuilder::new(&props);
        let first = builder
            .build(
                &ItemData {
                    claims: vec![claim("instance of", "Q5")],
                    ..ItemData::default()
                },
                None,
            )
            .unwrap();

        let mut with_qualifier = claim("instance of", "Q5");
        with_qualifier.qualifiers.push(SnakGroupData {
            property_name: "start time".to_string(),
            values: OneOrMany::One("2020-05-01".to_string()),
            replace: true,
        });
        let second = builder
            .build(
                &ItemData {
                    claims: vec![with_qualifier],
                    ..ItemData::default()
                },
                Some(first),
            )
            .unwrap();

        let statements = second.statements("P31");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].qualifiers["P580"].len(), 1);
        assert_eq!(statements[0].qualifiers_order, vec!["P580"]);
    }

    #[test]
    fn test_replace_qualifiers_vs_append() {
        let props = resolver();
        let builder = ItemBuilder::new(&props);
        let mut c = claim("instance of", "Q5");
        c.qualifiers.push(SnakGroupData {
            property_name: "start time".to_string(),
            values: OneOrMany::Many(vec!["2020-01-01".to_string(), "2021-01-01".to_string()]),
            replace: true,
        });
        let doc = builder
            .build(&ItemData { claims: vec![c], ..ItemData::default() }, None)
            .unwrap();
        assert_eq!(doc.statements("P31")[0].qualifiers["P580"].len(), 2);

        let mut append = claim("instance of", "Q5");
        append.qualifiers.push(SnakGroupData {
            property_name: "start time".to_string(),
            values: OneOrMany::One("2022-01-01".to_string()),
            replace: false,
        });
        let appended = builder
            .build(&ItemData { claims: vec![append.clone()], ..ItemData::default() }, Some(doc.clone()))
            .unwrap();
        assert_eq!(appended.statements("P31")[0].qualifiers["P580"].len(), 3);

        append.qualifiers[0].replace = true;
        let replaced = builder
            .build(&ItemData { claims: vec![append], ..ItemData::default() }, Some(doc))
            .unwrap();
        assert_eq!(replaced.statements("P31")[0].qualifiers["P580"].len(), 1);
    }

    #[test]
    fn test_references_replace_drops_empty_blocks() {
        let props = resolver();
        let builder = ItemBuilder::new(&props);
        let mut c = claim("instance of", "Q5");
        c.references.push(SnakGroupData {
            property_name: "reference URL".to_string(),
            values: OneOrMany::One("https://a.example".to_string()),
            replace: true,
        });
        let doc = builder
            .build(&ItemData { claims: vec![c.clone()], ..ItemData::default() }, None)
            .unwrap();
        assert_eq!(doc.statements("P31")[0].references.len(), 1);

        c.references[0].values = OneOrMany::One("https://b.example".to_string());
        let doc = builder
            .build(&ItemData { claims: vec![c], ..ItemData::default() }, Some(doc))
            .unwrap();
        let refs = &doc.statements("P31")[0].references;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].snaks["P854"][0]["datavalue"]["value"], "https://b.example");
    }

    #[test]
    fn test_unknown_property_fails_before_mutation() {
        let props = resolver();
        let data = ItemData {
            label: Some("x".to_string()),
            claims: vec![claim("no such property", "v")],
            ..ItemData::default()
        };
        let err = ItemBuilder::new(&props).build(&data, None).unwrap_err();
        assert!(matches!(err, WbError::UnknownProperty(p) if p == "no such property"));
    }

    #[test]
    fn test_existing_entity_with_empty_arrays_parses() {
        let entity = json!({
            "type": "item",
            "id": "Q123",
            "labels": [],
            "descriptions": {"en": {"language": "en", "value": "thing"}},
            "aliases": [],
            "claims": {
                "P31": [{
                    "id": "Q123$abc",
                    "mainsnak": {"snaktype": "value", "property": "P31", "datatype": "wikibase-item",
                                 "datavalue": {"type": "wikibase-entityid", "value": {"entity-type": "item", "numeric-id": 5, "id": "Q5"}}},
                    "type": "statement",
                    "rank": "normal",
                    "qualifiers": [],
                    "references": []
                }]
            },
            "sitelinks": {"enwiki": {"site": "enwiki", "title": "Thing"}},
            "lastrevid": 42
        });
        let doc = ItemDocument::from_entity_json(entity).unwrap();
        assert_eq!(doc.id.as_deref(), Some("Q123"));
        assert_eq!(doc.statements("P31")[0].main_value().as_deref(), Some("Q5"));

        let payload = doc.edit_payload().unwrap();
        assert!(payload.get("lastrevid").is_none());
        assert_eq!(payload["sitelinks"]["enwiki"]["title"], "Thing");
    }

    #[test]
    fn test_snak_value_extraction() {
        let mono = json!({"datavalue": {"value": {"text": "Douglas Adams", "language": "en"}}});
        assert_eq!(snak_value(&mono).as_deref(), Some("Douglas Adams"));
        let plain = json!({"datavalue": {"value": "abc"}});
        assert_eq!(snak_value(&plain).as_deref(), Some("abc"));
        assert_eq!(snak_value(&json!({"snaktype": "novalue"})), None);
    }

    #[test]
    fn test_item_data_deserializes_loose_shapes() {
        let data: ItemData = serde_json::from_value(json!({
            "label": "Test",
            "aliases": "One",
            "claims": [{
                "property_name": "instance of",
                "value": "Q5",
                "qualifiers": [{"property_name": "start time", "values": "2020-01-01"}]
            }]
        }))
        .unwrap();
        assert_eq!(data.aliases.to_vec(), vec!["One"]);
        assert!(data.claims[0].qualifiers[0].replace);
        assert!(data.claims[0].references.is_empty());
    }

    #[test]
    fn test_template_round_trips_through_json() {
        let template = item_data_template();
        let text = serde_json::to_string(&template).unwrap();
        let back: ItemData = serde_json::from_str(&text).unwrap();
        assert_eq!(back.claims.len(), 1);
        assert!(back.claims[0].qualifiers[0].replace);
    }
}
