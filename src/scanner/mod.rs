//! Project scanner for building the directory map and reading single files.
//!
//! This module walks a project tree, skips excluded names, and records one
//! entry per file, optionally inlining the text of files whose extension is
//! on the allow-list.

use crate::models::{DirectoryEntry, FileRecord, ProjectMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Extensions whose content may be inlined or read.
///
/// Matching compares against a dot-prefixed extension, so the bare `pdf`
/// and `txt` entries never match a real file.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".py", ".tsx", ".json", "pdf", "txt"];

/// Names that are never listed or descended into.
pub const DEFAULT_EXCLUDES: &[&str] = &["node_modules", ".env", ".git", "package-lock.json"];

/// Errors produced while scanning or reading files.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A directory could not be listed. Fatal for the whole scan.
    #[error("Cannot read directory {}: {source}", path.display())]
    Directory { path: PathBuf, source: io::Error },

    /// A single file could not be read.
    #[error("Error reading file: {source}")]
    File { path: PathBuf, source: io::Error },

    /// The file's extension is not on the allow-list.
    #[error("File extension '{0}' not allowed.")]
    ExtensionNotAllowed(String),
}

impl ScanError {
    /// Directory-level failures abort a scan; the others concern one file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::Directory { .. })
    }

    /// The directory or file the error concerns, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ScanError::Directory { path, .. } | ScanError::File { path, .. } => Some(path),
            ScanError::ExtensionNotAllowed(_) => None,
        }
    }
}

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Extensions allowed for reading, compared with their leading dot (e.g. ".js")
    pub extensions: Vec<String>,
    /// Exact entry names to skip (e.g. "node_modules", ".git")
    pub excludes: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
        }
    }
}

/// A listed directory entry.
#[derive(Debug)]
enum Entry {
    Directory { name: String, path: PathBuf },
    File { name: String, path: PathBuf },
}

/// Scanner producing project maps.
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    /// Create a new scanner.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan `root` recursively and return the project map.
    ///
    /// Directory listing failures abort the scan. File read failures are
    /// stored as error records.
    pub fn scan(&self, root: &Path, include_content: bool) -> Result<ProjectMap, ScanError> {
        let root_name = root.file_name().map(|n| n.to_string_lossy());
        if root_name.is_some_and(|name| self.is_excluded(&name)) {
            debug!("Scan root {} is excluded", root.display());
            return Ok(ProjectMap::new());
        }

        self.walk_dir(root, "", include_content)
    }

    /// Read one file as text if its extension is allowed.
    pub fn read_file(&self, path: &Path) -> Result<String, ScanError> {
        let ext = extension_of(path);
        if !self.is_allowed(&ext) {
            return Err(ScanError::ExtensionNotAllowed(ext));
        }

        read_text(path)
    }

    /// Check if an extension (with its leading dot) is on the allow-list.
    pub fn is_allowed(&self, ext: &str) -> bool {
        !ext.is_empty() && self.config.extensions.iter().any(|allowed| allowed == ext)
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        self.config.excludes.iter().any(|pattern| name == pattern)
    }

    /// Walk one directory, returning its own entry plus every subdirectory's.
    fn walk_dir(
        &self,
        dir: &Path,
        relative: &str,
        include_content: bool,
    ) -> Result<ProjectMap, ScanError> {
        debug!("Scanning directory {}", dir.display());

        let mut map = ProjectMap::new();
        let mut files = DirectoryEntry::new();

        for entry in self.list_entries(dir)? {
            match entry {
                Entry::Directory { name, path } => {
                    let child = join_relative(relative, &name);
                    map.extend(self.walk_dir(&path, &child, include_content)?);
                }
                Entry::File { name, path } => {
                    let record = self.file_record(&path, include_content);
                    files.insert(name, record);
                }
            }
        }

        map.insert(relative.to_string(), files);
        Ok(map)
    }

    /// List a directory, dropping excluded names.
    fn list_entries(&self, dir: &Path) -> Result<Vec<Entry>, ScanError> {
        let directory_error = |source| ScanError::Directory {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(directory_error)? {
            let entry = entry.map_err(directory_error)?;
            let name = entry.file_name().to_string_lossy().to_string();

            if self.is_excluded(&name) {
                debug!("Skipping excluded entry {}", entry.path().display());
                continue;
            }

            // Symlinks are not followed here; they land in the file branch.
            let file_type = entry.file_type().map_err(directory_error)?;
            let path = entry.path();
            if file_type.is_dir() {
                entries.push(Entry::Directory { name, path });
            } else {
                entries.push(Entry::File { name, path });
            }
        }

        Ok(entries)
    }

    /// Build the record for one file.
    fn file_record(&self, path: &Path, include_content: bool) -> FileRecord {
        if !include_content || !self.is_allowed(&extension_of(path)) {
            return FileRecord::empty();
        }

        match read_text(path) {
            Ok(content) => FileRecord::content(content),
            Err(err) => {
                warn!("Failed to read {}: {}", path.display(), err);
                FileRecord::error(err.to_string())
            }
        }
    }
}

/// Read a file as text. Invalid UTF-8 sequences become U+FFFD.
fn read_text(path: &Path) -> Result<String, ScanError> {
    let bytes = fs::read(path).map_err(|source| ScanError::File {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extension of a path including its leading dot, or `""` when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

fn join_relative(relative: &str, name: &str) -> String {
    if relative.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", relative, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn setup_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        write(root, "package.json", br#"{"name": "test"}"#);
        write(root, ".env", b"API_KEY=secret");
        write(root, "package-lock.json", b"{}");
        write(root, "src/test.js", br#"console.log("hello");"#);
        write(root, "src/test.py", br#"print("hello")"#);
        write(root, "src/test.tsx", b"export default function() {}");
        write(root, "src/data.json", br#"{"test": true}"#);
        write(root, "src/readme.txt", b"This should be ignored");
        write(root, "src/manual.pdf", b"%PDF-1.4");
        write(root, "node_modules/ignored.js", b"ignored");

        dir
    }

    fn scanner() -> FileScanner {
        FileScanner::new(ScanConfig::default())
    }

    fn all_keys(map: &ProjectMap) -> Vec<String> {
        map.iter()
            .flat_map(|(dir, files)| {
                std::iter::once(dir.clone()).chain(files.keys().cloned())
            })
            .collect()
    }

    #[test]
    fn test_scan_minimal_scenario() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/app.js", b"x=1;");
        write(dir.path(), ".env", b"SECRET=1");
        write(dir.path(), "node_modules/lib.js", b"module.exports = {};");

        let map = scanner().scan(dir.path(), true).unwrap();

        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            json!({ "": {}, "src": { "app.js": { "content": "x=1;" } } })
        );
    }

    #[test]
    fn test_scan_without_content() {
        let dir = setup_project();
        let map = scanner().scan(dir.path(), false).unwrap();

        assert!(map.contains_key(""));
        assert!(map.contains_key("src"));
        assert!(!map.contains_key("node_modules"));

        let root = &map[""];
        assert!(root.contains_key("package.json"));
        assert!(!root.contains_key(".env"));
        assert!(!root.contains_key("package-lock.json"));

        let src = &map["src"];
        for name in ["test.js", "test.py", "test.tsx", "data.json", "readme.txt"] {
            assert!(src[name].is_empty(), "{} should have an empty record", name);
        }
    }

    #[test]
    fn test_scan_with_content() {
        let dir = setup_project();
        let map = scanner().scan(dir.path(), true).unwrap();

        let src = &map["src"];
        assert_eq!(src["test.js"].as_content(), Some(r#"console.log("hello");"#));
        assert_eq!(src["test.py"].as_content(), Some(r#"print("hello")"#));
        assert_eq!(src["test.tsx"].as_content(), Some("export default function() {}"));
        assert_eq!(src["data.json"].as_content(), Some(r#"{"test": true}"#));
        assert_eq!(
            map[""]["package.json"].as_content(),
            Some(r#"{"name": "test"}"#)
        );
    }

    #[test]
    fn test_bare_allow_list_entries_never_match() {
        let dir = setup_project();
        let map = scanner().scan(dir.path(), true).unwrap();

        assert!(map["src"]["readme.txt"].is_empty());
        assert!(map["src"]["manual.pdf"].is_empty());
        assert!(scanner().is_allowed(".js"));
        assert!(!scanner().is_allowed(".txt"));
        assert!(!scanner().is_allowed(".pdf"));
        assert!(!scanner().is_allowed(""));
    }

    #[test]
    fn test_excluded_names_absent_at_any_depth() {
        let dir = setup_project();
        write(dir.path(), "src/node_modules/deep.js", b"deep");
        write(dir.path(), "src/.git/HEAD", b"ref: refs/heads/main");
        write(dir.path(), "src/nested/.env", b"X=1");
        write(dir.path(), "src/nested/package-lock.json", b"{}");
        write(dir.path(), "src/nested/ok.js", b"ok");
        write(dir.path(), "lib/node_modules", b"a file, not a directory");

        let map = scanner().scan(dir.path(), true).unwrap();
        let excluded = ["node_modules", ".git", ".env", "package-lock.json"];

        for key in all_keys(&map) {
            let last = key.rsplit('/').next().unwrap_or(&key);
            assert!(!excluded.contains(&last), "excluded name {} in result", key);
        }
        assert_eq!(map["src/nested"]["ok.js"].as_content(), Some("ok"));
        assert!(map["lib"].is_empty());
    }

    #[test]
    fn test_nested_directories_keyed_by_relative_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/b/c/deep.py", b"pass");
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let map = scanner().scan(dir.path(), false).unwrap();

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["", "a", "a/b", "a/b/c", "empty"]);
        assert!(map["a/b/c"].contains_key("deep.py"));
        assert!(map["empty"].is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_becomes_error_record() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("target"), dir.path().join("bad.js")).unwrap();
        write(dir.path(), "good.js", b"let ok = true;");

        let map = scanner().scan(dir.path(), true).unwrap();

        let error = map[""]["bad.js"].as_error().unwrap();
        assert!(error.starts_with("Error reading file: "));
        assert_eq!(map[""]["good.js"].as_content(), Some("let ok = true;"));
        assert!(map.contains_key("target"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_without_content_is_empty() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("target"), dir.path().join("bad.js")).unwrap();

        let map = scanner().scan(dir.path(), false).unwrap();
        assert!(map[""]["bad.js"].is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_decoded_with_replacement() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "legacy.js", b"// caf\xe9\nx=1;");

        let map = scanner().scan(dir.path(), true).unwrap();
        assert_eq!(
            map[""]["legacy.js"].as_content(),
            Some("// caf\u{fffd}\nx=1;")
        );

        let content = scanner().read_file(&dir.path().join("legacy.js")).unwrap();
        assert_eq!(content, "// caf\u{fffd}\nx=1;");
    }

    #[test]
    fn test_scan_is_idempotent() {
        let dir = setup_project();
        let first = scanner().scan(dir.path(), true).unwrap();
        let second = scanner().scan(dir.path(), true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_scan_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = scanner().scan(&missing, false).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ScanError::Directory { ref path, .. } if *path == missing));
    }

    #[test]
    fn test_scan_root_named_like_exclusion_is_empty() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "node_modules/pkg/index.js", b"x");

        let map = scanner().scan(&dir.path().join("node_modules"), true).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_custom_config() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.rs", b"fn main() {}");
        write(dir.path(), "target/debug/out.rs", b"generated");
        write(dir.path(), "app.js", b"x");

        let config = ScanConfig {
            extensions: vec![".rs".to_string()],
            excludes: vec!["target".to_string()],
        };
        let map = FileScanner::new(config).scan(dir.path(), true).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map[""]["main.rs"].as_content(), Some("fn main() {}"));
        assert!(map[""]["app.js"].is_empty());
    }

    #[test]
    fn test_read_file_allowed() {
        let dir = setup_project();
        let content = scanner()
            .read_file(&dir.path().join("src").join("test.js"))
            .unwrap();
        assert_eq!(content, r#"console.log("hello");"#);
    }

    #[test]
    fn test_read_file_disallowed_extension() {
        let dir = setup_project();
        let err = scanner()
            .read_file(&dir.path().join("src").join("readme.txt"))
            .unwrap_err();

        assert!(!err.is_fatal());
        assert!(err.to_string().contains("not allowed"));
        assert_eq!(err.to_string(), "File extension '.txt' not allowed.");
    }

    #[test]
    fn test_read_file_without_extension() {
        let err = scanner().read_file(Path::new("Makefile")).unwrap_err();
        assert_eq!(err.to_string(), "File extension '' not allowed.");

        let err = scanner().read_file(Path::new(".env")).unwrap_err();
        assert!(matches!(err, ScanError::ExtensionNotAllowed(ref ext) if ext.is_empty()));
    }

    #[test]
    fn test_read_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = scanner()
            .read_file(&dir.path().join("nonexistent.js"))
            .unwrap_err();

        assert!(!err.is_fatal());
        assert_eq!(err.path(), Some(dir.path().join("nonexistent.js").as_path()));
        assert!(err.to_string().contains("Error reading file"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("src/app.js")), ".js");
        assert_eq!(extension_of(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new(".env")), "");
        assert_eq!(extension_of(Path::new("Makefile")), "");
        assert_eq!(extension_of(Path::new("trailing.")), ".");
    }
}
