//! Per-asset parse cache.
//!
//! The tokenized geometry and material documents are built once per asset
//! and shared by every object load. All access goes through one exclusive
//! lock, so parses on the same asset run one after another while different
//! assets stay independent.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{
    error::{ObjError, ObjResult},
    lines::{Document, split_lines},
    mesh::MeshLod,
    source::{ByteSource, stem_of},
};

/// Parsed state of one asset plus memoized per-object results.
#[derive(Debug, Default)]
pub struct CacheEntry {
    pub geometry: Document,
    pub materials: Document,
    pub object_names: Option<Vec<String>>,
    pub lods: HashMap<String, MeshLod>,
    valid: bool,
}

impl CacheEntry {
    /// Tokenize the geometry blob and every referenced material library.
    fn build(&mut self, source: &dyn ByteSource) -> ObjResult<()> {
        let (blob, base_name) = locate_geometry(source).ok_or(ObjError::SourceNotFound)?;

        *self = CacheEntry::default();
        self.geometry = split_lines(&blob);
        log::info!(
            "Tokenized OBJ geometry: {} bytes, {} lines",
            blob.len(),
            self.geometry.len()
        );

        for (_, line) in self.geometry.directives("mtllib") {
            let path = line.remaining(1);
            let bytes = source.load_path(&path).or_else(|| {
                let fallback = format!("{}.mtl", base_name.as_deref()?);
                log::debug!("mtllib '{}' not found, trying '{}'", path, fallback);
                source.load_path(&fallback)
            });
            match bytes {
                Some(bytes) => self.materials.extend(split_lines(&bytes)),
                None => log::warn!("Material library '{}' could not be resolved", path),
            }
        }

        self.valid = true;
        Ok(())
    }
}

/// Find the geometry blob: the direct blob, or the first archive entry
/// ending in `.obj`. Returns the bytes and the document base name.
fn locate_geometry(source: &dyn ByteSource) -> Option<(Vec<u8>, Option<String>)> {
    match source.archive_entries() {
        Some(entries) => {
            let name = entries.into_iter().find(|name| name.ends_with(".obj"))?;
            let blob = source.blob_by_name(&name)?;
            Some((blob, Some(stem_of(&name))))
        }
        None => Some((source.primary_blob()?, source.base_name())),
    }
}

/// Lock-guarded [`CacheEntry`] owned by one asset.
#[derive(Debug, Default)]
pub struct AssetCache {
    entry: Mutex<CacheEntry>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-build the entry and run `f` on it, all under the asset lock.
    ///
    /// A failed build leaves the entry invalid; the next call retries.
    pub fn with_entry<R>(
        &self,
        source: &dyn ByteSource,
        f: impl FnOnce(&mut CacheEntry) -> ObjResult<R>,
    ) -> ObjResult<R> {
        let mut entry = self.entry.lock();
        if !entry.valid {
            entry.build(source)?;
        }
        f(&mut entry)
    }

    /// Store `lod` under `name` unless a result is already there, and
    /// return whichever is stored. An entry invalidated in the meantime
    /// stays empty and `lod` is passed through.
    pub fn memoize(&self, name: &str, lod: MeshLod) -> MeshLod {
        let mut entry = self.entry.lock();
        if !entry.valid {
            return lod;
        }
        entry.lods.entry(name.to_string()).or_insert(lod).clone()
    }

    pub fn is_built(&self) -> bool {
        self.entry.lock().valid
    }

    /// Drop documents and memoized results; the next access rebuilds.
    pub fn invalidate(&self) {
        *self.entry.lock() = CacheEntry::default();
    }
}
