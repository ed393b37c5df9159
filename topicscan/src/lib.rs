pub mod config;
pub mod corpus;
pub mod document;
pub mod errors;
pub mod loader;
pub mod matcher;
pub mod metrics;
pub mod parser;
pub mod results;
pub mod strategy;
pub mod trace;

pub use config::{ConfigOverrides, ScanConfig};
pub use corpus::CorpusEnumerator;
pub use document::{DocumentId, Item, RawDocument, StructuredRecord};
pub use errors::{ScanError, ScanResult};
pub use loader::{DocumentLoader, FsLoader, MemoryLoader, StorageLayout};
pub use matcher::TopicMatcher;
pub use parser::{DocumentFormat, DocumentParser, JsonFeedParser, RssParser};
pub use results::{DocumentFailure, FailurePhase, ScanReport};
pub use strategy::{ScanContext, ScanStrategy, Strategy};
