//! Instruction-template and reference-document store.
//!
//! Each skill lives in its own directory under the store root:
//!
//! ```text
//! skills/
//!   transcript-analysis/
//!     SKILL.md
//!     domain-knowledge/*.md
//! ```
//!
//! Files are read once and cached for the lifetime of the store.

use crate::error::{PipelineError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

const PROMPT_FILE: &str = "SKILL.md";
const REFERENCE_DIR: &str = "domain-knowledge";

/// Keyed, cached lookup of skill prompts and reference documents.
#[derive(Debug)]
pub struct SkillStore {
    root: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl SkillStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the cache with a skill prompt, bypassing the filesystem.
    pub fn insert_prompt(&self, skill: &str, text: impl Into<String>) {
        self.put(prompt_key(skill), text.into());
    }

    /// Seed the cache with a reference document, bypassing the filesystem.
    pub fn insert_reference(&self, skill: &str, filename: &str, text: impl Into<String>) {
        self.put(reference_key(skill, filename), text.into());
    }

    /// Load `{root}/{skill}/SKILL.md`.
    pub fn load_prompt(&self, skill: &str) -> Result<String> {
        let path = self.root.join(skill).join(PROMPT_FILE);
        self.load_cached(prompt_key(skill), &path)
    }

    /// Load `{root}/{skill}/domain-knowledge/{filename}`.
    pub fn load_reference(&self, skill: &str, filename: &str) -> Result<String> {
        let path = self.root.join(skill).join(REFERENCE_DIR).join(filename);
        self.load_cached(reference_key(skill, filename), &path)
    }

    /// Markdown reference documents available for a skill, sorted by name.
    ///
    /// Returns an empty list when the skill has no reference folder.
    pub fn list_references(&self, skill: &str) -> Result<Vec<String>> {
        let dir = self.root.join(skill).join(REFERENCE_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Drop every cached entry, including seeded ones.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    fn put(&self, key: String, text: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, text);
        }
    }

    fn load_cached(&self, key: String, path: &Path) -> Result<String> {
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return Ok(hit);
        }
        if !path.is_file() {
            return Err(PipelineError::TemplateNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = text.len(), "loaded skill file");
        self.put(key, text.clone());
        Ok(text)
    }
}

fn prompt_key(skill: &str) -> String {
    format!("{}_prompt", skill)
}

fn reference_key(skill: &str, filename: &str) -> String {
    format!("{}_dk_{}", skill, filename)
}
