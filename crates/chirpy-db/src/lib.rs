pub mod error;
pub mod ids;
pub mod models;
pub mod queries;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

pub use error::{Result, StoreError};
pub use ids::{EntityKind, IdAllocator};
pub use models::Document;

/// JSON document store. Every call re-reads the document from disk; every
/// mutation holds the write lock across load, change and persist so
/// concurrent writers can't drop each other's updates.
pub struct Database {
    path: PathBuf,
    lock: RwLock<()>,
    ids: IdAllocator,
}

impl Database {
    /// Open (creating if needed) the document at `path`. With `debug` set any
    /// existing document is discarded first.
    pub fn open(path: &Path, debug: bool) -> Result<Self> {
        if debug {
            match fs::remove_file(path) {
                Ok(()) => info!("Debug mode: discarded existing database at {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if !path.try_exists()? {
            write_document(path, &Document::default())?;
            info!("Created empty database at {}", path.display());
        }

        let doc = read_document(path)?;
        let ids = IdAllocator::seeded(&doc);

        info!(
            "Database opened at {} ({} chirps, {} users)",
            path.display(),
            doc.chirps.len(),
            doc.users.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
            ids,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Document) -> Result<T>,
    {
        let _guard = self.lock.read().map_err(|_| StoreError::LockPoisoned)?;
        let doc = read_document(&self.path)?;
        f(&doc)
    }

    /// Load, apply `f`, persist. Nothing is written when `f` fails.
    pub fn mutate<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document, &IdAllocator) -> Result<T>,
    {
        let _guard = self.lock.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut doc = read_document(&self.path)?;
        let out = f(&mut doc, &self.ids)?;
        write_document(&self.path, &doc)?;
        Ok(out)
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Write to a sibling temp file, flush it to disk, then rename over the document.
fn write_document(path: &Path, doc: &Document) -> Result<()> {
    let data = serde_json::to_vec(doc)?;
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(&data)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&temp_path, path)?;
    debug!("Persisted {} bytes to {}", data.len(), path.display());
    Ok(())
}
