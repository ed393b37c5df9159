use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::{Item, RawDocument, StructuredRecord};
use crate::errors::{ScanError, ScanResult};

/// Turns raw bytes into a structured record. Must be pure and deterministic.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, raw: &RawDocument) -> ScanResult<StructuredRecord>;
}

#[derive(Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

/// Parses RSS 2.0 feeds (`<rss><channel><item>...`)
#[derive(Debug, Clone, Copy, Default)]
pub struct RssParser;

impl DocumentParser for RssParser {
    fn parse(&self, raw: &RawDocument) -> ScanResult<StructuredRecord> {
        let text = std::str::from_utf8(&raw.bytes)
            .map_err(|e| ScanError::decode(&raw.id, format!("invalid UTF-8: {}", e)))?;
        let rss: Rss =
            quick_xml::de::from_str(text).map_err(|e| ScanError::decode(&raw.id, e.to_string()))?;
        Ok(StructuredRecord::new(rss.channel.items))
    }
}

/// Parses `{"items": [{"title": ..., "description": ...}]}` documents
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFeedParser;

impl DocumentParser for JsonFeedParser {
    fn parse(&self, raw: &RawDocument) -> ScanResult<StructuredRecord> {
        serde_json::from_slice(&raw.bytes).map_err(|e| ScanError::decode(&raw.id, e.to_string()))
    }
}

/// Supported on-disk document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Rss,
    Json,
}

impl DocumentFormat {
    pub fn parser(self) -> Box<dyn DocumentParser> {
        match self {
            DocumentFormat::Rss => Box::new(RssParser),
            DocumentFormat::Json => Box::new(JsonFeedParser),
        }
    }

    /// Conventional file extension for the format
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Rss => "xml",
            DocumentFormat::Json => "json",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Rss => f.write_str("rss"),
            DocumentFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rss" | "xml" => Ok(DocumentFormat::Rss),
            "json" => Ok(DocumentFormat::Json),
            other => Err(ScanError::config_error(format!(
                "unsupported document format '{}'",
                other
            ))),
        }
    }
}
