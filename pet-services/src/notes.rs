//! File and folder notes, persisted as `key|note` lines or a JSON object

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::NoteError;

const DELIMITER: char = '|';

/// On-disk layout of the note store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteFormat {
    /// One `key|note` record per line
    Lines,
    /// A single JSON object `{key: note}`
    Json,
}

impl NoteFormat {
    /// `.json` files use JSON, everything else uses lines.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Lines,
        }
    }
}

/// In-memory note map backed by a file
#[derive(Debug, Clone)]
pub struct NoteStore {
    path: PathBuf,
    format: NoteFormat,
    notes: BTreeMap<String, String>,
}

impl NoteStore {
    /// Empty store that will persist to `path` on the first write.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            format: NoteFormat::from_path(&path),
            path,
            notes: BTreeMap::new(),
        }
    }

    /// Load every note from `path`.
    ///
    /// A missing or empty file gives an empty store; malformed records are
    /// logged and skipped.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, NoteError> {
        let mut store = Self::empty(path);
        store.load_all()?;
        Ok(store)
    }

    /// Re-read the backing file, replacing the in-memory map.
    pub fn load_all(&mut self) -> Result<(), NoteError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("Note store {} does not exist yet", self.path.display());
                self.notes.clear();
                return Ok(());
            }
            Err(e) => return Err(NoteError::Storage(e)),
        };

        self.notes = match self.format {
            NoteFormat::Lines => parse_lines(&content),
            NoteFormat::Json => parse_json(&content, &self.path),
        };
        log::info!("Loaded {} notes from {}", self.notes.len(), self.path.display());
        Ok(())
    }

    /// Note for an exact key.
    pub fn get(&self, key: &str) -> Result<&str, NoteError> {
        self.notes
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| NoteError::NotFound(key.to_string()))
    }

    /// Insert or overwrite a note, then persist the whole store.
    pub fn set(&mut self, key: &str, note: &str) -> Result<(), NoteError> {
        if key.is_empty() {
            return Err(NoteError::InvalidKey(key.to_string()));
        }
        let note = match self.format {
            NoteFormat::Lines => {
                if key.contains(DELIMITER) || key.contains('\n') || key.contains('\r') {
                    return Err(NoteError::InvalidKey(key.to_string()));
                }
                note.replace(['\r', '\n'], " ")
            }
            NoteFormat::Json => note.to_string(),
        };

        self.notes.insert(key.to_string(), note);
        self.persist()
    }

    fn persist(&self) -> Result<(), NoteError> {
        let content = match self.format {
            NoteFormat::Lines => self
                .notes
                .iter()
                .map(|(k, v)| format!("{}{}{}\n", k, DELIMITER, v))
                .collect::<String>(),
            NoteFormat::Json => serde_json::to_string_pretty(&self.notes)
                .map_err(|e| NoteError::Storage(std::io::Error::new(ErrorKind::InvalidData, e)))?,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, content)?;
        log::debug!("Saved {} notes to {}", self.notes.len(), self.path.display());
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.notes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.notes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> NoteFormat {
        self.format
    }
}

fn parse_lines(content: &str) -> BTreeMap<String, String> {
    let mut notes = BTreeMap::new();
    // Keys and notes keep their surrounding whitespace
    for (number, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        match line.split_once(DELIMITER) {
            Some((key, note)) if !key.is_empty() => {
                notes.insert(key.to_string(), note.to_string());
            }
            _ => log::warn!("Skipping malformed note line {}: {:?}", number + 1, line),
        }
    }
    notes
}

fn parse_json(content: &str, path: &Path) -> BTreeMap<String, String> {
    if content.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_json::from_str(content) {
        Ok(notes) => notes,
        Err(e) => {
            log::warn!("Ignoring unreadable note file {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}
