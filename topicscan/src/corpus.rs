use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::document::DocumentId;
use crate::errors::{ScanError, ScanResult};

/// Produces the ordered id list a scan runs over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusEnumerator {
    /// `<prefix>-0000.<extension>` up to `count` ids
    Sequence {
        prefix: String,
        count: usize,
        extension: String,
    },
    /// Every file under `root` with an allowed extension, relative to `root`
    Directory {
        root: PathBuf,
        extensions: Option<Vec<String>>,
    },
}

impl CorpusEnumerator {
    pub fn sequence(prefix: impl Into<String>, count: usize) -> Self {
        Self::Sequence {
            prefix: prefix.into(),
            count,
            extension: "xml".to_string(),
        }
    }

    pub fn directory(root: impl Into<PathBuf>, extensions: Option<Vec<String>>) -> Self {
        Self::Directory {
            root: root.into(),
            extensions,
        }
    }

    /// Overrides the extension used for sequence ids
    pub fn with_extension(self, ext: impl Into<String>) -> Self {
        match self {
            Self::Sequence { prefix, count, .. } => Self::Sequence {
                prefix,
                count,
                extension: ext.into(),
            },
            other => other,
        }
    }

    pub fn enumerate(&self) -> ScanResult<Vec<DocumentId>> {
        match self {
            Self::Sequence {
                prefix,
                count,
                extension,
            } => Ok((0..*count)
                .map(|i| DocumentId::from(format!("{}-{:04}.{}", prefix, i, extension)))
                .collect()),
            Self::Directory { root, extensions } => walk(root, extensions.as_deref()),
        }
    }
}

fn has_valid_extension(path: &Path, extensions: Option<&[String]>) -> bool {
    match extensions {
        None => true,
        Some(exts) => path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| exts.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
            .unwrap_or(false),
    }
}

fn walk(root: &Path, extensions: Option<&[String]>) -> ScanResult<Vec<DocumentId>> {
    if !root.is_dir() {
        return Err(ScanError::corpus_error(format!(
            "corpus directory {} does not exist",
            root.display()
        )));
    }

    debug!("Scanning corpus directory: {}", root.display());
    let mut builder = WalkBuilder::new(root);
    builder.hidden(true).standard_filters(true).require_git(false);

    let mut ids: Vec<DocumentId> = builder
        .build()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|e| has_valid_extension(e.path(), extensions))
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?.to_str()?.to_string();
            trace!("Adding document: {}", relative);
            Some(DocumentId::from(relative))
        })
        .collect();
    ids.sort();

    info!("Found {} documents under {}", ids.len(), root.display());
    Ok(ids)
}
