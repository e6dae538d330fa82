//! Byte sources: where geometry, material and texture bytes come from.

use std::{
    fs,
    path::{Path, PathBuf},
};

/// Raw byte access for one asset.
///
/// An asset is either a single blob (`archive_entries` returns `None`) or an
/// archive of named entries. Paths referenced from inside documents
/// (`mtllib`, `map_Kd`, ...) go through [`ByteSource::load_path`].
pub trait ByteSource: Send + Sync {
    /// Entry names in archive order, `None` when the asset is a single blob.
    fn archive_entries(&self) -> Option<Vec<String>> {
        None
    }

    /// The blob of a non-archive asset.
    fn primary_blob(&self) -> Option<Vec<u8>>;

    fn blob_by_name(&self, _name: &str) -> Option<Vec<u8>> {
        None
    }

    /// Resolve a path referenced by a document.
    fn load_path(&self, path: &str) -> Option<Vec<u8>>;

    /// Primary document name without directory or extension.
    fn base_name(&self) -> Option<String>;
}

/// Normalize a document-relative path: Windows separators and a leading
/// `./` are common in exported OBJ files.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").map(str::to_owned).unwrap_or(path)
}

/// Strip directory and extension from an entry or file name.
pub fn stem_of(name: &str) -> String {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rfind('.') {
        Some(dot) if dot > 0 => file[..dot].to_string(),
        _ => file.to_string(),
    }
}

/// Single OBJ file on disk. Referenced paths resolve against its directory.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read(path: &Path) -> Option<Vec<u8>> {
        match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::debug!("Failed to read {}: {}", path.display(), err);
                None
            }
        }
    }
}

impl ByteSource for FileSource {
    fn primary_blob(&self) -> Option<Vec<u8>> {
        Self::read(&self.path)
    }

    fn load_path(&self, path: &str) -> Option<Vec<u8>> {
        let relative = PathBuf::from(normalize_path(path));
        let resolved = match self.path.parent() {
            Some(dir) if !relative.is_absolute() => dir.join(relative),
            _ => relative,
        };
        Self::read(&resolved)
    }

    fn base_name(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    }
}

/// In-memory asset: either one named blob plus side files, or an archive.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    primary: Option<(String, Vec<u8>)>,
    entries: Vec<(String, Vec<u8>)>,
    archive: bool,
}

impl MemorySource {
    /// Single document called `name`.
    pub fn single(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            primary: Some((name.into(), bytes.into())),
            entries: Vec::new(),
            archive: false,
        }
    }

    /// Archive whose entries keep insertion order.
    pub fn archive() -> Self {
        Self {
            primary: None,
            entries: Vec::new(),
            archive: true,
        }
    }

    /// Add a named file reachable through `load_path` (and as an archive
    /// entry when this is an archive).
    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.push((normalize_path(&name.into()), bytes.into()));
        self
    }

    fn entry(&self, name: &str) -> Option<Vec<u8>> {
        let name = normalize_path(name);
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, bytes)| bytes.clone())
    }
}

impl ByteSource for MemorySource {
    fn archive_entries(&self) -> Option<Vec<String>> {
        self.archive
            .then(|| self.entries.iter().map(|(name, _)| name.clone()).collect())
    }

    fn primary_blob(&self) -> Option<Vec<u8>> {
        self.primary.as_ref().map(|(_, bytes)| bytes.clone())
    }

    fn blob_by_name(&self, name: &str) -> Option<Vec<u8>> {
        self.entry(name)
    }

    fn load_path(&self, path: &str) -> Option<Vec<u8>> {
        self.entry(path)
    }

    fn base_name(&self) -> Option<String> {
        self.primary.as_ref().map(|(name, _)| stem_of(name))
    }
}
