use chrono::Utc;
#[cfg(test)]
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Storage slot holding the serialized favorites document.
pub trait FavoritesStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&self, contents: &str) -> io::Result<()>;
    /// Keeps a copy of `contents` somewhere `save` will not touch; returns where.
    fn back_up(&self, contents: &str) -> io::Result<String>;
}

/// A single JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoritesStore for FileStore {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        // Replace atomically: write a sibling file, then rename it over the old one.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)
    }

    fn back_up(&self, contents: &str) -> io::Result<String> {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "favorites.json".to_string());
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let backup = self.path.with_file_name(format!("{name}.{stamp}.bak"));
        fs::write(&backup, contents)?;
        Ok(backup.display().to_string())
    }
}

/// In-memory slot.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RefCell<Option<String>>,
    backups: RefCell<Vec<String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_contents(contents: &str) -> Self {
        Self {
            slot: RefCell::new(Some(contents.to_string())),
            ..Default::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.borrow().clone()
    }

    pub fn backups(&self) -> Vec<String> {
        self.backups.borrow().clone()
    }
}

#[cfg(test)]
impl FavoritesStore for MemoryStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&self, contents: &str) -> io::Result<()> {
        *self.slot.borrow_mut() = Some(contents.to_string());
        Ok(())
    }

    fn back_up(&self, contents: &str) -> io::Result<String> {
        self.backups.borrow_mut().push(contents.to_string());
        Ok(format!("memory backup #{}", self.backups.borrow().len()))
    }
}
