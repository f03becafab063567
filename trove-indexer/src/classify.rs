//! Extension classification and ignore filtering.
//!
//! Two external JSON documents drive file selection: `file_types.json`
//! maps categories to extension lists (`{"text": [".rs", ".md"], ...}`),
//! and `ignore.json` names extensions and file names to drop before
//! classification. Both load fail-open: a missing or malformed document
//! yields an empty table/policy with a warning, never an error.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Content category of a classified extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Text,
    Video,
    Image,
}

impl Category {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Normalize an extension to lowercase with a leading dot.
///
/// Empty input stays empty.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// Lowercase dotted extension of a path, if it has one.
fn path_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Immutable extension → category table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct ClassificationTable {
    ext_to_category: HashMap<String, Category>,
}

impl ClassificationTable {
    /// Load `file_types.json`, fail-open on any error.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(table) => table,
            Err(e) => {
                warn!("could not load {}: {e}", path.display());
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let document: HashMap<String, Vec<String>> = serde_json::from_str(&raw)?;
        Ok(Self::from_document(document))
    }

    /// Build the table from a parsed category → extensions mapping.
    ///
    /// Unknown category names are dropped; extensions are normalized so
    /// lookups are case-insensitive.
    pub fn from_document(document: HashMap<String, Vec<String>>) -> Self {
        let mut ext_to_category = HashMap::new();
        for (name, extensions) in document {
            let Some(category) = Category::from_name(&name) else {
                continue;
            };
            for ext in extensions {
                let normalized = normalize_extension(&ext);
                if !normalized.is_empty() {
                    ext_to_category.insert(normalized, category);
                }
            }
        }
        Self { ext_to_category }
    }

    /// Category of an extension, or `None` if unclassified.
    pub fn classify(&self, extension: &str) -> Option<Category> {
        self.ext_to_category
            .get(&normalize_extension(extension))
            .copied()
    }

    /// Category of a path's extension.
    pub fn classify_path(&self, path: &Path) -> Option<Category> {
        path_extension(path)
            .and_then(|ext| self.ext_to_category.get(&ext))
            .copied()
    }

    /// Sorted extension list for one category.
    pub fn extensions_for(&self, category: Category) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .ext_to_category
            .iter()
            .filter(|(_, c)| **c == category)
            .map(|(ext, _)| ext.clone())
            .collect();
        extensions.sort();
        extensions
    }

    pub fn is_empty(&self) -> bool {
        self.ext_to_category.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
struct IgnoreDocument {
    #[serde(default)]
    ignore_extensions: Vec<String>,
    #[serde(default)]
    ignore_files: Vec<String>,
    /// Legacy key: a bare extension list.
    #[serde(default)]
    ignore: Vec<String>,
}

/// Extensions and file names dropped before classification.
#[derive(Debug, Clone, Default)]
pub struct IgnorePolicy {
    extensions: HashSet<String>,
    file_names: HashSet<String>,
}

impl IgnorePolicy {
    /// Load `ignore.json`, fail-open on any error.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(policy) => policy,
            Err(e) => {
                warn!("could not load {}: {e}", path.display());
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let document: IgnoreDocument = serde_json::from_str(&raw)?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: IgnoreDocument) -> Self {
        let raw_extensions = if document.ignore_extensions.is_empty() {
            document.ignore
        } else {
            document.ignore_extensions
        };
        let extensions = raw_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        let file_names = document
            .ignore_files
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        Self {
            extensions,
            file_names,
        }
    }

    /// True when the path's lowercase basename or extension is ignored.
    ///
    /// Checked before classification: an ignored path never reaches the
    /// classification table.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.file_names.contains(&name.to_lowercase()) {
                return true;
            }
        }
        if let Some(ext) = path_extension(path) {
            if self.extensions.contains(&ext) {
                return true;
            }
        }
        false
    }

    /// Sorted ignored-extension list, for handing to the scan service.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.extensions.iter().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Sorted ignored-file-name list, for handing to the scan service.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.file_names.iter().cloned().collect();
        names.sort();
        names
    }
}

/// Collect every file under `root` whose extension is in `extensions`,
/// honoring the ignore policy. A `root` that is itself a file is matched
/// directly. Used by the video and image phases.
pub fn collect_files_by_extension(
    root: &Path,
    extensions: &[String],
    ignore: &IgnorePolicy,
) -> Vec<std::path::PathBuf> {
    let ext_set: HashSet<String> = extensions.iter().map(|e| normalize_extension(e)).collect();

    if root.is_file() {
        if ignore.is_ignored(root) {
            return Vec::new();
        }
        return match path_extension(root) {
            Some(ext) if ext_set.contains(&ext) => vec![root.to_path_buf()],
            _ => Vec::new(),
        };
    }

    let mut matches = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if ignore.is_ignored(path) {
            continue;
        }
        if let Some(ext) = path_extension(path) {
            if ext_set.contains(&ext) {
                matches.push(path.to_path_buf());
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample_table() -> ClassificationTable {
        ClassificationTable::from_document(HashMap::from([
            ("text".to_string(), vec![".txt".to_string(), "RS".to_string()]),
            ("video".to_string(), vec![".mp4".to_string()]),
            ("image".to_string(), vec![".png".to_string()]),
            ("bogus".to_string(), vec![".zzz".to_string()]),
        ]))
    }

    #[test]
    fn classification_is_case_insensitive_and_dot_normalized() {
        let table = sample_table();
        assert_eq!(table.classify(".TXT"), Some(Category::Text));
        assert_eq!(table.classify("txt"), Some(Category::Text));
        assert_eq!(table.classify(".rs"), Some(Category::Text));
        assert_eq!(table.classify(".mp4"), Some(Category::Video));
        assert_eq!(table.classify(".zzz"), None);
        assert_eq!(table.classify(".unknown"), None);
    }

    #[test]
    fn extensions_for_returns_sorted_category_members() {
        let table = sample_table();
        assert_eq!(table.extensions_for(Category::Text), vec![".rs", ".txt"]);
    }

    #[test]
    fn missing_document_fails_open() {
        let table = ClassificationTable::load(Path::new("/nonexistent/file_types.json"));
        assert!(table.is_empty());
        let policy = IgnorePolicy::load(Path::new("/nonexistent/ignore.json"));
        assert!(!policy.is_ignored(Path::new("anything.pyc")));
    }

    #[test]
    fn malformed_document_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_types.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(ClassificationTable::load(&path).is_empty());
    }

    #[test]
    fn ignore_matches_basename_and_extension() {
        let policy = IgnorePolicy::from_document(IgnoreDocument {
            ignore_extensions: vec!["pyc".to_string(), ".LOCK".to_string()],
            ignore_files: vec![".DS_Store".to_string()],
            ignore: vec![],
        });
        assert!(policy.is_ignored(Path::new("/a/b/cache.pyc")));
        assert!(policy.is_ignored(Path::new("/a/b/Cargo.LOCK")));
        assert!(policy.is_ignored(Path::new("/a/b/.ds_store")));
        assert!(!policy.is_ignored(Path::new("/a/b/main.rs")));
    }

    #[test]
    fn legacy_ignore_key_supplies_extensions() {
        let policy = IgnorePolicy::from_document(IgnoreDocument {
            ignore_extensions: vec![],
            ignore_files: vec![],
            ignore: vec![".tmp".to_string()],
        });
        assert!(policy.is_ignored(Path::new("scratch.tmp")));
    }

    #[test]
    fn collect_honors_ignore_policy() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), b"v").unwrap();
        fs::write(dir.path().join("b.mp4"), b"v").unwrap();
        fs::write(dir.path().join("c.txt"), b"t").unwrap();
        let policy = IgnorePolicy::from_document(IgnoreDocument {
            ignore_extensions: vec![],
            ignore_files: vec!["b.mp4".to_string()],
            ignore: vec![],
        });

        let found = collect_files_by_extension(dir.path(), &[".mp4".to_string()], &policy);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.mp4"));
    }

    #[test]
    fn collect_accepts_single_file_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("only.png");
        fs::write(&file, b"i").unwrap();
        let policy = IgnorePolicy::default();

        let found = collect_files_by_extension(&file, &[".png".to_string()], &policy);
        assert_eq!(found, vec![file]);
    }
}
