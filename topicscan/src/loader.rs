use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::document::{DocumentId, RawDocument};
use crate::errors::{ScanError, ScanResult};

const BUFFER_CAPACITY: usize = 65536;

/// Fetches raw document bytes by id.
///
/// Loading is split into `open` and `read` so instrumented strategies can
/// bracket each step on its own. Implementations do not retry.
pub trait DocumentLoader: Send + Sync {
    /// Opens the underlying resource for `id`
    fn open(&self, id: &DocumentId) -> ScanResult<Box<dyn Read + Send>>;

    /// Reads an opened source to the end
    fn read(&self, id: &DocumentId, mut source: Box<dyn Read + Send>) -> ScanResult<RawDocument> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| ScanError::from_io(id, e))?;
        trace!("Read {} bytes from {}", bytes.len(), id);
        Ok(RawDocument::new(id.clone(), bytes))
    }

    /// Opens and fully reads `id`
    fn load(&self, id: &DocumentId) -> ScanResult<RawDocument> {
        let source = self.open(id)?;
        self.read(id, source)
    }
}

/// How document ids map to files under the corpus root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLayout {
    /// `root/<id>`
    Direct,
    /// `root/<first len chars of id>.<extension>`; many ids can share one file
    SharedPrefix { len: usize, extension: String },
}

/// Loads documents from the filesystem
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
    layout: StorageLayout,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layout: StorageLayout::Direct,
        }
    }

    pub fn with_layout(mut self, layout: StorageLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the storage location of `id`
    pub fn path_for(&self, id: &DocumentId) -> PathBuf {
        match &self.layout {
            StorageLayout::Direct => self.root.join(id.as_str()),
            StorageLayout::SharedPrefix { len, extension } => {
                let prefix: String = id.as_str().chars().take(*len).collect();
                self.root.join(format!("{}.{}", prefix, extension))
            }
        }
    }
}

impl DocumentLoader for FsLoader {
    fn open(&self, id: &DocumentId) -> ScanResult<Box<dyn Read + Send>> {
        let path = self.path_for(id);
        trace!("Opening {} at {}", id, path.display());
        let file = File::open(&path).map_err(|e| ScanError::from_io(id, e))?;
        Ok(Box::new(BufReader::with_capacity(BUFFER_CAPACITY, file)))
    }
}

/// Serves documents from memory; used by tests and benchmarks
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<DocumentId, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<DocumentId>, bytes: impl Into<Vec<u8>>) {
        self.documents.insert(id.into(), bytes.into());
    }

    pub fn with_document(mut self, id: impl Into<DocumentId>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(id, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentLoader for MemoryLoader {
    fn open(&self, id: &DocumentId) -> ScanResult<Box<dyn Read + Send>> {
        let bytes = self
            .documents
            .get(id)
            .ok_or_else(|| ScanError::not_found(id))?;
        Ok(Box::new(Cursor::new(bytes.clone())))
    }
}
