use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::corpus::CorpusEnumerator;
use crate::errors::{ScanError, ScanResult};
use crate::loader::{FsLoader, StorageLayout};
use crate::parser::DocumentFormat;
use crate::strategy::Strategy;

/// Configuration for a scan.
///
/// # Configuration Locations
///
/// Loaded from the following locations, later ones taking precedence:
/// 1. Global `$HOME/.config/topicscan/config.yaml`
/// 2. Local `.topicscan.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line flags override all of them, see [`ScanConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Substring to count (case-sensitive)
/// topic: "president"
///
/// # Directory holding the corpus
/// corpus_dir: "data"
///
/// # Generate `newsfeed-0000.xml`.. ids instead of walking corpus_dir
/// document_count: 4000
/// id_prefix: "newsfeed"
///
/// # Map every id onto `<first N chars>.<ext>` (one shared file)
/// shared_prefix_len: 8
///
/// # rss or json
/// format: "rss"
///
/// # shared-queue, per-document, bounded, cpu-pool, traced-pool, pipeline
/// strategy: "cpu-pool"
///
/// # Worker count / semaphore capacity (default: CPU cores)
/// parallelism: 8
///
/// # Buffer size of each pipeline queue
/// pipeline_capacity: 100
///
/// log_level: "warn"
/// trace: false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Substring counted in item titles and descriptions
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Directory the corpus is read from
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// When set, ids are generated as `<id_prefix>-NNNN.<ext>` instead of
    /// walking `corpus_dir`
    #[serde(default)]
    pub document_count: Option<usize>,

    /// Prefix for generated ids
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// File extension of documents; derived from `format` when unset
    #[serde(default)]
    pub extension: Option<String>,

    /// Store many ids in one file named after their first N characters
    #[serde(default)]
    pub shared_prefix_len: Option<usize>,

    #[serde(default)]
    pub format: DocumentFormat,

    #[serde(default)]
    pub strategy: Strategy,

    /// Worker count for pooled strategies and the semaphore capacity
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_parallelism")]
    pub parallelism: NonZeroUsize,

    /// Buffer size of each queue between pipeline stages
    #[serde(default = "default_pipeline_capacity")]
    pub pipeline_capacity: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Forward task/region markers to the log
    #[serde(default)]
    pub trace: bool,
}

fn default_topic() -> String {
    "president".to_string()
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_id_prefix() -> String {
    "newsfeed".to_string()
}

pub(crate) fn default_parallelism() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

pub(crate) fn default_pipeline_capacity() -> NonZeroUsize {
    NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            corpus_dir: default_corpus_dir(),
            document_count: None,
            id_prefix: default_id_prefix(),
            extension: None,
            shared_prefix_len: None,
            format: DocumentFormat::default(),
            strategy: Strategy::default(),
            parallelism: default_parallelism(),
            pipeline_capacity: default_pipeline_capacity(),
            log_level: default_log_level(),
            trace: false,
        }
    }
}

/// Values given on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub topic: Option<String>,
    pub corpus_dir: Option<PathBuf>,
    pub document_count: Option<usize>,
    pub shared_prefix_len: Option<usize>,
    pub format: Option<DocumentFormat>,
    pub strategy: Option<Strategy>,
    pub parallelism: Option<NonZeroUsize>,
    pub pipeline_capacity: Option<NonZeroUsize>,
    pub log_level: Option<String>,
    pub trace: bool,
}

impl ScanConfig {
    /// Loads configuration from the default locations
    pub fn load() -> ScanResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, layering a specific file on top of the defaults
    pub fn load_from(config_path: Option<&Path>) -> ScanResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("topicscan/config.yaml")),
            // Local config
            Some(PathBuf::from(".topicscan.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit path must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line values over configuration file values
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(topic) = cli.topic {
            self.topic = topic;
        }
        if let Some(dir) = cli.corpus_dir {
            self.corpus_dir = dir;
        }
        if cli.document_count.is_some() {
            self.document_count = cli.document_count;
        }
        if cli.shared_prefix_len.is_some() {
            self.shared_prefix_len = cli.shared_prefix_len;
        }
        if let Some(format) = cli.format {
            self.format = format;
        }
        if let Some(strategy) = cli.strategy {
            self.strategy = strategy;
        }
        if let Some(parallelism) = cli.parallelism {
            self.parallelism = parallelism;
        }
        if let Some(capacity) = cli.pipeline_capacity {
            self.pipeline_capacity = capacity;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        if cli.trace {
            self.trace = true;
        }
        self
    }

    pub fn validate(&self) -> ScanResult<()> {
        if self.shared_prefix_len == Some(0) {
            return Err(ScanError::config_error(
                "shared_prefix_len must be greater than zero",
            ));
        }
        if self.id_prefix.is_empty() && self.document_count.is_some() {
            return Err(ScanError::config_error(
                "id_prefix is required when document_count is set",
            ));
        }
        Ok(())
    }

    /// Extension of corpus documents
    pub fn extension(&self) -> &str {
        self.extension
            .as_deref()
            .unwrap_or_else(|| self.format.extension())
    }

    /// Enumerator matching this configuration
    pub fn enumerator(&self) -> CorpusEnumerator {
        match self.document_count {
            Some(count) => {
                CorpusEnumerator::sequence(self.id_prefix.clone(), count)
                    .with_extension(self.extension())
            }
            None => CorpusEnumerator::directory(
                self.corpus_dir.clone(),
                Some(vec![self.extension().to_string()]),
            ),
        }
    }

    /// Filesystem loader matching this configuration
    pub fn loader(&self) -> FsLoader {
        let loader = FsLoader::new(self.corpus_dir.clone());
        match self.shared_prefix_len {
            Some(len) => loader.with_layout(StorageLayout::SharedPrefix {
                len,
                extension: self.extension().to_string(),
            }),
            None => loader,
        }
    }
}
