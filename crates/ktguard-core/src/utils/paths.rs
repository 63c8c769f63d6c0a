//! Path helpers for reports and baselines.

use std::path::{Component, Path};

/// Renders `path` relative to `root` with `/` separators.
///
/// Paths outside `root` are rendered as given.
#[must_use]
pub fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

/// Returns `true` if any directory component of `path` equals one of `dirs`.
#[must_use]
pub fn has_dir_component(path: &Path, dirs: &[String]) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };
    parent.components().any(|c| match c {
        Component::Normal(s) => dirs.iter().any(|d| s.to_str() == Some(d.as_str())),
        _ => false,
    })
}
