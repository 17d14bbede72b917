//! SHA-256 checksums for migration drift detection.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of the migration contents.
pub fn compute_checksum(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_hashes_to_known_value() {
        assert_eq!(
            compute_checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn one_byte_change_yields_a_different_checksum() {
        let a = compute_checksum("create table config (k int, v text)");
        let b = compute_checksum("create table config (k int, v text);");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
