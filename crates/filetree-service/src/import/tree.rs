//! Input model for tree imports.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;

use filetree_core::error::AppError;
use filetree_core::result::AppResult;

/// Bytes of one uploaded file plus what the client said about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    /// Original client-side file name; becomes the node name.
    pub name: String,
    /// MIME type.
    pub mime: String,
    /// File content.
    pub data: Bytes,
}

impl FilePayload {
    /// Create a payload, guessing the MIME type from the file name.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            mime,
            data: data.into(),
        }
    }

    /// Override the guessed MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// One entry of a [`TreeDescription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    /// A folder and its ordered contents.
    Folder(TreeDescription),
    /// A file.
    File(FilePayload),
}

/// An ordered mapping from names to folders or files.
///
/// Iteration follows insertion order, which is also the order nodes are
/// created in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDescription {
    entries: Vec<(String, TreeEntry)>,
}

/// Totals over a description, computed without touching storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of folders.
    pub folders: u64,
    /// Number of files.
    pub files: u64,
    /// Sum of file sizes.
    pub bytes: u64,
    /// Largest single file.
    pub largest_file: u64,
}

impl TreeDescription {
    /// An empty description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, name: impl Into<String>, entry: TreeEntry) {
        self.entries.push((name.into(), entry));
    }

    /// Builder form of [`push`](Self::push) for a folder.
    pub fn with_folder(mut self, name: impl Into<String>, children: TreeDescription) -> Self {
        self.push(name, TreeEntry::Folder(children));
        self
    }

    /// Builder form of [`push`](Self::push) for a file keyed by its own name.
    pub fn with_file(mut self, payload: FilePayload) -> Self {
        let name = payload.name.clone();
        self.push(name, TreeEntry::File(payload));
        self
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[(String, TreeEntry)] {
        &self.entries
    }

    /// Consume the description, yielding its entries.
    pub fn into_entries(self) -> Vec<(String, TreeEntry)> {
        self.entries
    }

    /// Whether there is nothing to import.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names the entries at this level will take as nodes.
    pub fn top_level_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, entry)| match entry {
            TreeEntry::Folder(_) => key.as_str(),
            TreeEntry::File(payload) => payload.name.as_str(),
        })
    }

    /// Count folders, files, and bytes at every depth.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut pending: Vec<&TreeDescription> = vec![self];
        while let Some(level) = pending.pop() {
            for (_, entry) in &level.entries {
                match entry {
                    TreeEntry::Folder(children) => {
                        stats.folders += 1;
                        pending.push(children);
                    }
                    TreeEntry::File(payload) => {
                        stats.files += 1;
                        stats.bytes += payload.size();
                        stats.largest_file = stats.largest_file.max(payload.size());
                    }
                }
            }
        }
        stats
    }

    /// Check every level for unusable or duplicated names.
    pub fn validate(&self) -> AppResult<()> {
        let mut pending: Vec<(String, &TreeDescription)> = vec![(String::new(), self)];
        while let Some((prefix, level)) = pending.pop() {
            let mut seen = HashSet::new();
            for ((key, entry), name) in level.entries.iter().zip(level.top_level_names()) {
                validate_segment(name)
                    .map_err(|reason| AppError::invalid_input(format!("'{prefix}{name}': {reason}")))?;
                if !seen.insert(name) {
                    return Err(AppError::invalid_input(format!(
                        "'{prefix}{name}' appears more than once"
                    )));
                }
                if let TreeEntry::Folder(children) = entry {
                    pending.push((format!("{prefix}{key}/"), children));
                }
            }
        }
        Ok(())
    }

    /// Build a description from `(relative path, payload)` pairs such as
    /// `("photos/2024/a.jpg", ...)`.
    ///
    /// Intermediate folders are created on first mention. A path that uses
    /// one name as both a file and a folder is invalid input.
    pub fn from_relative_paths(files: impl IntoIterator<Item = (String, FilePayload)>) -> AppResult<Self> {
        let mut root = Builder::default();
        for (relative, payload) in files {
            let segments: Vec<&str> = relative.split('/').collect();
            for segment in &segments {
                validate_segment(segment).map_err(|reason| {
                    AppError::invalid_input(format!("Invalid path '{relative}': {reason}"))
                })?;
            }
            let Some((file_name, folders)) = segments.split_last() else {
                return Err(AppError::invalid_input("Empty relative path"));
            };

            let mut level = &mut root;
            for folder in folders {
                level = level.folder(folder, &relative)?;
            }
            level.file(file_name, payload, &relative)?;
        }
        Ok(root.finish())
    }
}

/// Longest node name, in characters. Matches the folder-name rule.
const MAX_NAME_CHARS: usize = 255;

fn validate_segment(segment: &str) -> Result<(), &'static str> {
    if segment.trim().is_empty() {
        return Err("empty name");
    }
    if segment.chars().count() > MAX_NAME_CHARS {
        return Err("name is longer than 255 characters");
    }
    if segment == "." || segment == ".." {
        return Err("relative segments are not allowed");
    }
    if segment.contains('/') || segment.chars().any(char::is_control) {
        return Err("name contains '/' or control characters");
    }
    Ok(())
}

/// Mutable intermediate form used while grouping relative paths.
#[derive(Debug, Default)]
struct Builder {
    order: Vec<String>,
    folders: HashMap<String, Builder>,
    files: HashMap<String, FilePayload>,
}

impl Builder {
    fn folder(&mut self, name: &str, relative: &str) -> AppResult<&mut Builder> {
        if self.files.contains_key(name) {
            return Err(AppError::invalid_input(format!(
                "Invalid path '{relative}': '{name}' is already a file"
            )));
        }
        if !self.folders.contains_key(name) {
            self.order.push(name.to_string());
        }
        Ok(self.folders.entry(name.to_string()).or_default())
    }

    fn file(&mut self, name: &str, mut payload: FilePayload, relative: &str) -> AppResult<()> {
        if self.folders.contains_key(name) || self.files.contains_key(name) {
            return Err(AppError::invalid_input(format!(
                "Invalid path '{relative}': '{name}' is listed twice"
            )));
        }
        payload.name = name.to_string();
        self.order.push(name.to_string());
        self.files.insert(name.to_string(), payload);
        Ok(())
    }

    fn finish(mut self) -> TreeDescription {
        let mut description = TreeDescription::new();
        for name in self.order {
            if let Some(folder) = self.folders.remove(&name) {
                description.push(name, TreeEntry::Folder(folder.finish()));
            } else if let Some(file) = self.files.remove(&name) {
                description.push(name, TreeEntry::File(file));
            }
        }
        description
    }
}

#[cfg(test)]
mod tests {
    use filetree_core::ErrorKind;

    use super::*;

    fn payload(name: &str) -> FilePayload {
        FilePayload::new(name, Bytes::from_static(b"data"))
    }

    #[test]
    fn test_mime_is_guessed_from_name() {
        assert_eq!(payload("a.png").mime, "image/png");
        assert_eq!(payload("noext").mime, "application/octet-stream");
        assert_eq!(payload("a.png").with_mime("text/plain").mime, "text/plain");
    }

    #[test]
    fn test_from_relative_paths_groups_folders_in_first_seen_order() {
        let tree = TreeDescription::from_relative_paths([
            ("photos/2024/a.jpg".to_string(), payload("a.jpg")),
            ("notes.txt".to_string(), payload("notes.txt")),
            ("photos/b.jpg".to_string(), payload("b.jpg")),
            ("photos/2024/c.jpg".to_string(), payload("c.jpg")),
        ])
        .unwrap();

        let names: Vec<&str> = tree.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["photos", "notes.txt"]);
        let TreeEntry::Folder(photos) = &tree.entries()[0].1 else {
            panic!("photos should be a folder");
        };
        let names: Vec<&str> = photos.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["2024", "b.jpg"]);

        let stats = tree.stats();
        assert_eq!(stats.folders, 2);
        assert_eq!(stats.files, 4);
        assert_eq!(stats.bytes, 16);
    }

    #[test]
    fn test_from_relative_paths_rejects_bad_shapes() {
        let err = TreeDescription::from_relative_paths([
            ("a".to_string(), payload("a")),
            ("a/b.txt".to_string(), payload("b.txt")),
        ])
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);

        for bad in ["../x", "a//b", "./a", ""] {
            let err = TreeDescription::from_relative_paths([(bad.to_string(), payload("x"))])
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidInput, "{bad}");
        }
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_names() {
        let dup = TreeDescription::new()
            .with_file(payload("a.txt"))
            .with_file(payload("a.txt"));
        assert!(dup.validate().is_err());

        let nested_bad = TreeDescription::new()
            .with_folder("ok", TreeDescription::new().with_folder("..", TreeDescription::new()));
        assert!(nested_bad.validate().is_err());

        let good = TreeDescription::new()
            .with_folder("a", TreeDescription::new().with_file(payload("x.txt")))
            .with_file(payload("x.txt"));
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_names_are_limited_to_255_characters() {
        let longest = "é".repeat(255);
        assert!(TreeDescription::new().with_file(payload(&longest)).validate().is_ok());

        let too_long = "é".repeat(256);
        assert!(TreeDescription::new().with_file(payload(&too_long)).validate().is_err());
        assert!(
            TreeDescription::new()
                .with_folder(too_long.clone(), TreeDescription::new())
                .validate()
                .is_err()
        );
        let err = TreeDescription::from_relative_paths([(format!("{too_long}/a.txt"), payload("a.txt"))])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }
}
