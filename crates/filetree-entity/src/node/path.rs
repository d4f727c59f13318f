//! Materialized path rules.
//!
//! A node's path is the slug of its name, prefixed with the parent's path
//! unless the parent is the root. The root's path is empty. Paths are
//! unique per owner; the repository resolves collisions with
//! [`unique_path`] while it holds the owner's tree lock.

use super::model::Node;

/// Slug used when a name contains nothing sluggable.
pub const UNTITLED: &str = "untitled";

/// Turn a display name into a URL-safe path segment.
///
/// Letters and digits are lowercased and kept, whitespace and `-`, `_`, `.`
/// collapse into a single `-`, `@` reads as `at`, and everything else is
/// dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    fn push_word(slug: &mut String, word: &str, pending: &mut bool) {
        if *pending && !slug.is_empty() {
            slug.push('-');
        }
        *pending = false;
        slug.push_str(word);
    }

    for c in name.chars() {
        if c.is_alphanumeric() {
            let lower: String = c.to_lowercase().collect();
            push_word(&mut slug, &lower, &mut pending_separator);
        } else if c == '@' {
            pending_separator = true;
            push_word(&mut slug, "at", &mut pending_separator);
            pending_separator = true;
        } else if c.is_whitespace() || matches!(c, '-' | '_' | '.') {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        UNTITLED.to_string()
    } else {
        slug
    }
}

/// The path a child called `name` would get under `parent`.
pub fn child_path(parent: &Node, name: &str) -> String {
    join(&parent.path, parent.is_root(), name)
}

/// Join a parent path and a child name.
pub fn join(parent_path: &str, parent_is_root: bool, name: &str) -> String {
    let slug = slugify(name);
    if parent_is_root || parent_path.is_empty() {
        slug
    } else {
        format!("{parent_path}/{slug}")
    }
}

/// Return `base`, or the first of `base-2`, `base-3`, ... not already taken.
pub fn unique_path(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    (2u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Normalize a caller-supplied lookup path.
///
/// Leading, trailing, and repeated slashes are ignored. Returns `None` when
/// the path addresses the root.
pub fn normalize(path: &str) -> Option<String> {
    let joined = path
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() { None } else { Some(joined) }
}

/// SQL `LIKE` pattern matching every `-N` suffixed sibling of `base`.
pub fn suffix_like_pattern(base: &str) -> String {
    let mut escaped = String::with_capacity(base.len() + 2);
    for c in base.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push_str("-%");
    escaped
}
