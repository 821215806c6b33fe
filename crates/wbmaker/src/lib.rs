//! wbmaker: convenience layer for reading and writing structured data
//! against a Wikibase instance (Wikidata or a private wiki).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Wb                                  │
//! │   config ──► SparqlClient ──► query service (SELECT, JSON)   │
//! │          └─► MediaWikiClient ──► api.php / EntityData        │
//! │                                                              │
//! │   property map ──► ItemBuilder ──► wbeditentity payload      │
//! │   SPARQL / entity data ──► DataToInfo ──► wikitext template  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hierarchy path analysis over subclass trees lives in the
//! `wbmaker-hierarchy` crate, built on [`sparql::SparqlExecutor`].
//!
//! Nothing here logs in or writes to a wiki: edits are produced as JSON
//! documents for the caller to submit.

pub mod config;
pub mod error;
pub mod item;
pub mod mediawiki;
pub mod sparql;
pub mod templates;
pub mod wb;

pub use config::WbConfig;
pub use error::{ConfigError, Result, WbError};
pub use item::{
    Datatype, ItemBuilder, ItemData, ItemDocument, PropertyInfo, PropertyResolver, Snak,
    SnakValue,
};
pub use sparql::{SparqlClient, SparqlExecutor, SparqlRecord, SparqlResults, SparqlTable};
pub use templates::{DataToInfo, TemplateParams};
pub use wb::Wb;
