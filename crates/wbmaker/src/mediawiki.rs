//! Read-only MediaWiki / Wikibase API access.

use crate::error::{Result, WbError};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    client: Client,
    api_url: String,
    wikibase_url: String,
}

impl MediaWikiClient {
    pub fn new(api_url: &str, wikibase_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            wikibase_url: wikibase_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_get(&self, params: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!(api = %self.api_url, ?params, "MediaWiki API request");
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()?
            .error_for_status()?;
        let value: Value = response.json()?;
        if let Some(error) = value.get("error") {
            return Err(WbError::Response {
                service: "mediawiki",
                message: error.to_string(),
            });
        }
        Ok(value)
    }

    /// Current wikitext of `title`, `None` when the page does not exist.
    pub fn page_text(&self, title: &str) -> Result<Option<String>> {
        let value = self.api_get(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("rvprop", "content"),
            ("rvslots", "main"),
            ("titles", title),
        ])?;
        Ok(page_text_from_response(&value))
    }

    /// Full entity JSON via `wbgetentities`.
    pub fn get_entity(&self, id: &str) -> Result<Option<Value>> {
        let value = self.api_get(&[("action", "wbgetentities"), ("ids", id)])?;
        Ok(entity_from_response(value, id))
    }

    /// Datatype id (`wikibase-item`, `time`, ...) of a property.
    pub fn property_datatype(&self, pid: &str) -> Result<Option<String>> {
        let value = self.api_get(&[
            ("action", "wbgetentities"),
            ("ids", pid),
            ("props", "datatype"),
        ])?;
        Ok(datatype_from_response(value, pid))
    }

    pub fn wikibase_url(&self) -> &str {
        &self.wikibase_url
    }

    /// `Special:EntityData/{id}.json`; non-success responses are `None`.
    pub fn entity_data(&self, id: &str) -> Result<Option<Value>> {
        let url = format!("{}/wiki/Special:EntityData/{id}.json", self.wikibase_url);
        tracing::debug!(%url, "fetching entity data");
        let response = self.client.get(&url).send()?;
        if response.status() != StatusCode::OK {
            tracing::debug!(status = %response.status(), id, "entity data unavailable");
            return Ok(None);
        }
        match response.json::<Value>() {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(error = %e, id, "entity data was not JSON");
                Ok(None)
            }
        }
    }
}

pub fn page_text_from_response(value: &Value) -> Option<String> {
    let page = value.pointer("/query/pages")?.as_array()?.first()?;
    if page.get("missing").is_some() || page.get("invalid").is_some() {
        return None;
    }
    page.pointer("/revisions/0/slots/main/content")
        .or_else(|| page.pointer("/revisions/0/content"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn entity_from_response(mut value: Value, id: &str) -> Option<Value> {
    let entity = value.get_mut("entities")?.get_mut(id)?.take();
    if entity.get("missing").is_some() {
        return None;
    }
    Some(entity)
}

pub fn datatype_from_response(value: Value, pid: &str) -> Option<String> {
    entity_from_response(value, pid)?
        .get("datatype")
        .and_then(Value::as_str)
        .map(str::to_string)
}
