// src/watch/path_utils.rs

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Falls back to comparing canonicalized paths (symlinked temp dirs on
/// macOS report `/private/var/...`). Returns `None` if the path lies outside
/// `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    // A deleted file cannot be canonicalized; its parent usually can.
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => path.parent()?.canonicalize().ok()?.join(path.file_name()?),
    };
    path_canon.strip_prefix(&root_canon).ok().map(to_slash)
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
