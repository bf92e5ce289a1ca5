//! Project model — a directory of images plus the `items.json` manifest.
//!
//! A project is opened on a directory; every `.png`/`.jpg` below it (any
//! depth) becomes an item keyed by its root-relative path. The manifest
//! stores per-item flags and survives images being added or removed from the
//! directory: stale entries are kept, new images are added as active.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const MANIFEST_NAME: &str = "items.json";

/// Extension of mask sidecar files (PNG-encoded regardless of the name).
pub const MASK_EXTENSION: &str = "mask";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemEntry {
    pub active: bool,
}

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    Manifest(serde_json::Error),
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::Io(e) => write!(f, "I/O error: {}", e),
            ProjectError::Manifest(e) => write!(f, "bad items.json: {}", e),
        }
    }
}

impl From<std::io::Error> for ProjectError {
    fn from(e: std::io::Error) -> Self {
        ProjectError::Io(e)
    }
}

impl From<serde_json::Error> for ProjectError {
    fn from(e: serde_json::Error) -> Self {
        ProjectError::Manifest(e)
    }
}

/// Recursively collect image files under `root`, returned as sorted
/// root-relative path strings. Matching is by lowercased file name suffix.
pub fn find_images(root: &Path) -> Result<Vec<String>, ProjectError> {
    let mut result = Vec::new();
    walk(root, root, &mut result)?;
    result.sort();
    Ok(result)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), ProjectError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, out)?;
        } else if path.is_file() {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name.ends_with(".png") || name.ends_with(".jpg") {
                if let Ok(rel) = path.strip_prefix(root) {
                    out.push(rel.to_string_lossy().into_owned());
                }
            }
        }
    }
    Ok(())
}

/// Mask sidecar path for an image: same directory, same stem, `.mask`.
pub fn mask_path_for(image_path: &Path) -> PathBuf {
    image_path.with_extension(MASK_EXTENSION)
}

pub struct Project {
    root: PathBuf,
    /// Keyed by root-relative path; BTreeMap keeps display order sorted.
    items: BTreeMap<String, ItemEntry>,
    selected: Option<String>,
}

impl Project {
    /// Open a project directory: scan for images, merge with any existing
    /// manifest, and persist the merged manifest back to disk.
    pub fn open(root: PathBuf) -> Result<Self, ProjectError> {
        let manifest = root.join(MANIFEST_NAME);
        let mut items: BTreeMap<String, ItemEntry> = if manifest.exists() {
            let reader = BufReader::new(fs::File::open(&manifest)?);
            serde_json::from_reader(reader)?
        } else {
            BTreeMap::new()
        };

        for rel in find_images(&root)? {
            items.entry(rel).or_insert(ItemEntry { active: true });
        }

        let selected = items.keys().next().cloned();
        let project = Self {
            root,
            items,
            selected,
        };
        project.save_manifest()?;
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    pub fn save_manifest(&self) -> Result<(), ProjectError> {
        let writer = BufWriter::new(fs::File::create(self.manifest_path())?);
        serde_json::to_writer_pretty(writer, &self.items)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item keys in display order (sorted).
    pub fn filenames(&self) -> impl Iterator<Item = &String> {
        self.items.keys()
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.items.contains_key(rel)
    }

    pub fn is_active(&self, rel: &str) -> bool {
        self.items.get(rel).map(|e| e.active).unwrap_or(false)
    }

    /// Flip an item's active flag. Returns the new state, or `None` for an
    /// unknown key.
    pub fn toggle_active(&mut self, rel: &str) -> Option<bool> {
        let entry = self.items.get_mut(rel)?;
        entry.active = !entry.active;
        Some(entry.active)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, rel: &str) -> bool {
        if self.items.contains_key(rel) {
            self.selected = Some(rel.to_string());
            true
        } else {
            false
        }
    }

    /// Absolute path of an item's image file.
    pub fn image_path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Absolute path of an item's mask sidecar.
    pub fn mask_path(&self, rel: &str) -> PathBuf {
        mask_path_for(&self.image_path(rel))
    }

    /// Key of the item before the current selection, wrapping to the last
    /// item at the front of the list.
    pub fn previous(&self) -> Option<String> {
        self.step(-1)
    }

    /// Key of the item after the current selection, wrapping to the first.
    pub fn next(&self) -> Option<String> {
        self.step(1)
    }

    fn step(&self, delta: i64) -> Option<String> {
        if self.items.is_empty() {
            return None;
        }
        let keys: Vec<&String> = self.items.keys().collect();
        let index = match &self.selected {
            Some(sel) => keys.iter().position(|k| *k == sel).unwrap_or(0) as i64 + delta,
            None => 0,
        };
        let wrapped = index.rem_euclid(keys.len() as i64) as usize;
        Some(keys[wrapped].clone())
    }
}
