//! Saved businesses for the current user.
//!
//! The registry is opened once per session from a [`FavoritesStore`] and every
//! mutation rewrites the whole document before returning. Entries are snapshots
//! of a [`BusinessRecord`] taken at save time; they are never refreshed from
//! later listings.

pub mod store;

use crate::api::lenient;
use crate::api::models::RawImages;
use crate::listing::model::BusinessRecord;
use crate::listing::normalize::decode_image_list;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use store::FavoritesStore;
use thiserror::Error;
use tracing::{error, info, warn};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("favorites store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("favorites document is malformed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("favorites document version {0} is newer than this client supports")]
    UnsupportedVersion(u32),
    #[error("favorites cannot be saved this session; the stored file was left untouched")]
    ReadOnly,
}

/// Missing, null or oddly-typed fields default so documents written by older
/// clients still load. The aliases are the key names those clients used.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FavoriteEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: String,
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(deserialize_with = "lenient::text")]
    pub address: String,
    #[serde(alias = "phone_number", deserialize_with = "lenient::opt_text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub location_url: Option<String>,
    #[serde(alias = "openingTime", deserialize_with = "lenient::text")]
    pub opening_time: String,
    #[serde(alias = "closingTime", deserialize_with = "lenient::text")]
    pub closing_time: String,
    #[serde(alias = "image", deserialize_with = "lenient::text")]
    pub cover_image: String,
    #[serde(deserialize_with = "stored_images")]
    pub images: Vec<String>,
    #[serde(deserialize_with = "stored_timestamp")]
    pub saved_at: Option<DateTime<Utc>>,
}

// Older clients kept `images` exactly as the API sent it.
fn stored_images<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(decode_image_list(&RawImages::deserialize(deserializer)?))
}

fn stored_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    })
}

impl From<&BusinessRecord> for FavoriteEntry {
    fn from(record: &BusinessRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            kind: record.kind.clone(),
            description: record.description.clone(),
            address: record.address.clone(),
            phone: record.phone.clone(),
            location_url: record.location_url.clone(),
            opening_time: record.opening_time.clone(),
            closing_time: record.closing_time.clone(),
            cover_image: record.cover_image.clone(),
            images: record.images.clone(),
            saved_at: Some(Utc::now()),
        }
    }
}

#[derive(Serialize)]
struct Document<'a> {
    version: u32,
    favorites: &'a [FavoriteEntry],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDocument {
    Versioned {
        version: u32,
        #[serde(default)]
        favorites: Vec<FavoriteEntry>,
    },
    // Written before the document carried a version.
    Legacy(Vec<FavoriteEntry>),
}

/// Parses a stored document, migrating the unversioned layout.
pub fn parse_document(raw: &str) -> Result<Vec<FavoriteEntry>, FavoritesError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<StoredDocument>(raw)? {
        StoredDocument::Versioned { version, favorites } if version <= SCHEMA_VERSION => Ok(favorites),
        StoredDocument::Versioned { version, .. } => Err(FavoritesError::UnsupportedVersion(version)),
        StoredDocument::Legacy(favorites) => {
            info!(count = favorites.len(), "migrating unversioned favorites document");
            Ok(favorites)
        }
    }
}

pub struct FavoritesRegistry {
    store: Box<dyn FavoritesStore>,
    entries: Vec<FavoriteEntry>,
    /// Cleared when saving could destroy a document this session failed to read.
    writable: bool,
}

impl std::fmt::Debug for FavoritesRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesRegistry")
            .field("entries", &self.entries.len())
            .field("writable", &self.writable)
            .finish()
    }
}

impl FavoritesRegistry {
    /// Reads the store once. An unreadable document starts the session empty.
    ///
    /// A malformed document is backed up before anything can overwrite it; if
    /// that backup fails, or the document is from a newer client, or the store
    /// could not be read at all, the session runs without saving.
    pub fn open(store: Box<dyn FavoritesStore>) -> Self {
        let (entries, writable) = match store.load() {
            Ok(Some(raw)) => match parse_document(&raw) {
                Ok(entries) => (entries, true),
                Err(e @ FavoritesError::UnsupportedVersion(_)) => {
                    warn!(error = %e, "leaving stored favorites untouched");
                    (Vec::new(), false)
                }
                Err(e) => {
                    warn!(error = %e, "stored favorites are unreadable, starting empty");
                    match store.back_up(&raw) {
                        Ok(location) => {
                            info!(%location, "unreadable favorites backed up");
                            (Vec::new(), true)
                        }
                        Err(e) => {
                            error!(error = %e, "could not back up favorites, saving disabled");
                            (Vec::new(), false)
                        }
                    }
                }
            },
            Ok(None) => (Vec::new(), true),
            Err(e) => {
                warn!(error = %e, "could not read favorites store, saving disabled");
                (Vec::new(), false)
            }
        };

        // Collapse duplicates left behind by clients that allowed them.
        let mut seen = std::collections::HashSet::new();
        let entries: Vec<FavoriteEntry> = entries
            .into_iter()
            .filter(|e| !e.id.trim().is_empty() && seen.insert(e.id.clone()))
            .collect();

        info!(count = entries.len(), writable, "favorites loaded");
        Self {
            store,
            entries,
            writable,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn list(&self) -> &[FavoriteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&FavoriteEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Returns `false` without touching the store when the id is already saved.
    pub fn add(&mut self, entry: FavoriteEntry) -> Result<bool, FavoritesError> {
        if self.is_favorite(&entry.id) {
            return Ok(false);
        }
        self.entries.push(entry);
        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }
        Ok(true)
    }

    /// Returns `false` when nothing with that id was saved.
    pub fn remove(&mut self, id: &str) -> Result<bool, FavoritesError> {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };
        let removed = self.entries.remove(pos);
        if let Err(e) = self.persist() {
            self.entries.insert(pos, removed);
            return Err(e);
        }
        Ok(true)
    }

    /// Adds or removes `record`; returns whether it is a favorite afterwards.
    pub fn toggle(&mut self, record: &BusinessRecord) -> Result<bool, FavoritesError> {
        if self.is_favorite(&record.id) {
            self.remove(&record.id)?;
            Ok(false)
        } else {
            self.add(FavoriteEntry::from(record))?;
            Ok(true)
        }
    }

    fn persist(&self) -> Result<(), FavoritesError> {
        if !self.writable {
            return Err(FavoritesError::ReadOnly);
        }
        let doc = Document {
            version: SCHEMA_VERSION,
            favorites: &self.entries,
        };
        let json = serde_json::to_string(&doc)?;
        self.store.save(&json)?;
        Ok(())
    }
}
