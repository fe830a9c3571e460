// src/watch/hash.rs

use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Hex-encoded blake3 hash of a file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let data = fs
        .read(path)
        .with_context(|| format!("reading file for hashing: {:?}", path))?;
    Ok(hash_bytes(&data))
}

pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn same_content_same_hash() {
        let fs = MockFileSystem::new();
        fs.add_file("a.scss", "a{}");
        fs.add_file("b.scss", "a{}");
        assert_eq!(
            compute_file_hash(&fs, Path::new("a.scss")).unwrap(),
            compute_file_hash(&fs, Path::new("b.scss")).unwrap()
        );
        assert_ne!(hash_bytes(b"a{}"), hash_bytes(b"b{}"));
    }
}
