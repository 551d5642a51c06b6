//! JSON-document persistence for kit definitions.
//!
//! The whole definition set lives in a single `kits.json` document. Every
//! mutation rewrites it synchronously: the previous primary is first copied to
//! `kits.json.bak`, then the new content is written to a temp file under an
//! exclusive lock and renamed over the primary. A failed write restores the
//! backup so the primary is never left half-written, and the in-memory set only
//! changes once the document on disk does.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::kits::errors::KitError;
use crate::kits::types::{kit_key, Kit, KIT_SCHEMA_VERSION};
use crate::logutil::escape_log;
use crate::validation::validate_kit_name;

pub const KITS_FILE: &str = "kits.json";
pub const KITS_BACKUP_FILE: &str = "kits.json.bak";

type DocumentWriter = fn(&Path, &str) -> Result<(), KitError>;

#[derive(Debug, Serialize, Deserialize)]
struct KitDocument {
    #[serde(default)]
    schema_version: u8,
    #[serde(default)]
    kits: Vec<Kit>,
}

/// Owns every kit definition, keyed by lower-cased name.
pub struct KitStore {
    path: PathBuf,
    backup_path: PathBuf,
    kits: BTreeMap<String, Kit>,
    writer: DocumentWriter,
}

impl KitStore {
    /// Open (or create) the kit document inside `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, KitError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)?;
        let mut store = Self {
            path: dir.join(KITS_FILE),
            backup_path: dir.join(KITS_BACKUP_FILE),
            kits: BTreeMap::new(),
            writer: write_file_locked,
        };
        store.reload()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing document, falling back to the backup copy when the
    /// primary is unreadable.
    pub fn reload(&mut self) -> Result<(), KitError> {
        let kits = match Self::read_document(&self.path) {
            Ok(Some(kits)) => kits,
            Ok(None) => match Self::read_document(&self.backup_path) {
                Ok(Some(kits)) => {
                    warn!("{} missing, restored kits from backup", self.path.display());
                    kits
                }
                _ => Vec::new(),
            },
            Err(primary_err) => {
                warn!(
                    "Failed to load {}: {}; trying backup",
                    self.path.display(),
                    primary_err
                );
                match Self::read_document(&self.backup_path) {
                    Ok(Some(kits)) => kits,
                    Ok(None) => return Err(primary_err),
                    Err(backup_err) => {
                        warn!(
                            "Backup {} also unreadable: {}",
                            self.backup_path.display(),
                            backup_err
                        );
                        return Err(primary_err);
                    }
                }
            }
        };

        self.kits.clear();
        for mut kit in kits {
            if let Err(e) = validate_kit_name(&kit.name) {
                warn!("Skipping kit {}: {}", escape_log(&kit.name), e);
                continue;
            }
            kit.normalize();
            let key = kit.key();
            if self.kits.insert(key, kit).is_some() {
                warn!("Duplicate kit name in document; keeping the last definition");
            }
        }
        info!("Loaded {} kit(s) from {}", self.kits.len(), self.path.display());
        Ok(())
    }

    fn read_document(path: &Path) -> Result<Option<Vec<Kit>>, KitError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // Guard against any accidental leading NULs
        let cleaned = text.trim_start_matches('\0');
        let doc: KitDocument = serde_json::from_str(cleaned)?;
        if doc.schema_version > KIT_SCHEMA_VERSION {
            return Err(KitError::SchemaMismatch {
                entity: "kit document",
                expected: KIT_SCHEMA_VERSION,
                found: doc.schema_version,
            });
        }
        Ok(Some(doc.kits))
    }

    /// Write `kits` as the new document and adopt it once the write succeeds.
    fn commit(&mut self, kits: BTreeMap<String, Kit>) -> Result<(), KitError> {
        self.persist(&kits)?;
        self.kits = kits;
        Ok(())
    }

    fn persist(&self, kits: &BTreeMap<String, Kit>) -> Result<(), KitError> {
        let doc = KitDocument {
            schema_version: KIT_SCHEMA_VERSION,
            kits: kits.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&doc)?;

        if self.path.exists() {
            fs::copy(&self.path, &self.backup_path)?;
        }
        if let Err(e) = (self.writer)(&self.path, &content) {
            if self.backup_path.exists() {
                if let Err(restore_err) = fs::copy(&self.backup_path, &self.path) {
                    warn!("Failed to restore kit backup: {}", restore_err);
                }
            }
            return Err(e);
        }
        debug!("Persisted {} kit(s)", kits.len());
        Ok(())
    }

    pub fn get_kit(&self, name: &str) -> Option<&Kit> {
        self.kits.get(&kit_key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kits.contains_key(&kit_key(name))
    }

    /// Names as originally cased; hidden kits only when requested.
    pub fn get_kit_names(&self, include_hidden: bool) -> BTreeSet<String> {
        self.kits
            .values()
            .filter(|kit| include_hidden || !kit.hidden)
            .map(|kit| kit.name.clone())
            .collect()
    }

    pub fn kits(&self) -> impl Iterator<Item = &Kit> {
        self.kits.values()
    }

    pub fn first_join_kits(&self) -> Vec<&Kit> {
        self.kits.values().filter(|kit| kit.first_join_kit).collect()
    }

    /// Build a fresh, empty kit. It is not stored until passed to [`save_kit`].
    ///
    /// [`save_kit`]: KitStore::save_kit
    pub fn create_kit(&self, name: &str) -> Result<Kit, KitError> {
        let name = validate_kit_name(name)?;
        if self.contains(&name) {
            return Err(KitError::AlreadyExists(name));
        }
        Ok(Kit::new(&name))
    }

    /// Upsert: any case-insensitive match is replaced by `kit`.
    pub fn save_kit(&mut self, kit: Kit) -> Result<(), KitError> {
        validate_kit_name(&kit.name)?;
        let mut next = self.kits.clone();
        next.insert(kit.key(), kit);
        self.commit(next)
    }

    pub fn remove_kit(&mut self, name: &str) -> Result<bool, KitError> {
        let mut next = self.kits.clone();
        if next.remove(&kit_key(name)).is_none() {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    /// Move a kit to a new name in a single document write.
    pub fn rename_kit(&mut self, old: &str, new: &str) -> Result<(), KitError> {
        let new = validate_kit_name(new)?;
        let Some(existing) = self.get_kit(old).cloned() else {
            return Err(KitError::NotFound(format!("kit: {}", old)));
        };
        let case_only = kit_key(old) == kit_key(&new);
        if !case_only && self.contains(&new) {
            return Err(KitError::AlreadyExists(new));
        }
        let mut next = self.kits.clone();
        next.remove(&kit_key(old));
        next.insert(kit_key(&new), existing.renamed(&new));
        self.commit(next)
    }
}

/// Write `content` to `path` through a temp file and rename, holding an
/// exclusive lock on the destination for the duration.
fn write_file_locked(path: &Path, content: &str) -> Result<(), KitError> {
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    lock_file.lock_exclusive()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(KITS_FILE);
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e.into()),
        }
    };

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    // Persist the rename (best-effort)
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    drop(lock_file);
    Ok(())
}
