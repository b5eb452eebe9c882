//! Key material normalization
//!
//! The inventory references public keys either as literal key material or as
//! filesystem paths, and either as a single reference or a list. Everything
//! funnels through [`KeySpec::resolve`], which yields trimmed key strings in
//! declaration order.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix marking a reference as literal key material rather than a path
const LITERAL_KEY_PREFIX: &str = "ssh-";

/// A single classified key reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRef {
    /// Key material embedded directly in the inventory document
    Literal(String),
    /// Path to a file whose trimmed contents supply the key material
    Path(PathBuf),
}

impl KeyRef {
    /// Classify a raw reference string from the document
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        if raw.starts_with(LITERAL_KEY_PREFIX) {
            Self::Literal(raw.to_string())
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }

    /// Resolve the reference to trimmed key material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyFile`] if a path reference cannot be read. A bad
    /// reference is a fatal configuration error, not a soft skip.
    pub fn resolve(&self) -> Result<String> {
        match self {
            Self::Literal(key) => Ok(key.trim().to_string()),
            Self::Path(path) => {
                let contents = fs::read_to_string(path).map_err(|source| Error::KeyFile {
                    path: path.clone(),
                    source,
                })?;
                Ok(contents.trim().to_string())
            }
        }
    }
}

/// One or many key references, as the document writes them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    /// Single scalar reference
    One(String),
    /// Ordered list of references
    Many(Vec<String>),
}

impl KeySpec {
    /// Classified references in declaration order
    #[must_use]
    pub fn refs(&self) -> Vec<KeyRef> {
        match self {
            Self::One(raw) => vec![KeyRef::classify(raw)],
            Self::Many(raws) => raws.iter().map(|raw| KeyRef::classify(raw)).collect(),
        }
    }

    /// Resolve every reference to trimmed key material, preserving order.
    ///
    /// # Errors
    ///
    /// Propagates the first unreadable path reference as [`Error::KeyFile`].
    pub fn resolve(&self) -> Result<Vec<String>> {
        self.refs().iter().map(KeyRef::resolve).collect()
    }

    /// Apply a transformation to every raw reference in place.
    ///
    /// Used by config loading to expand `~` and `${VAR}` in path references
    /// before any resolution happens.
    pub fn rewrite_refs(&mut self, mut rewrite: impl FnMut(&str) -> String) {
        match self {
            Self::One(raw) => *raw = rewrite(raw),
            Self::Many(raws) => {
                for raw in raws {
                    *raw = rewrite(raw);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_classify_literal() {
        let key = "ssh-ed25519 AAAAC3Nz alice@laptop";
        assert_eq!(KeyRef::classify(key), KeyRef::Literal(key.to_string()));
    }

    #[test]
    fn test_classify_path() {
        assert_eq!(
            KeyRef::classify("keys/alice.pub"),
            KeyRef::Path(PathBuf::from("keys/alice.pub"))
        );
    }

    #[test]
    fn test_resolve_literal_trims() {
        let keyref = KeyRef::Literal("  ssh-rsa BBBB root  ".to_string());
        assert_eq!(keyref.resolve().unwrap(), "ssh-rsa BBBB root");
    }

    #[test]
    fn test_resolve_path_reads_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bob.pub");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "ssh-ed25519 CCCC bob@desk").unwrap();
        drop(f);

        let keyref = KeyRef::Path(path);
        assert_eq!(keyref.resolve().unwrap(), "ssh-ed25519 CCCC bob@desk");
    }

    #[test]
    fn test_resolve_missing_path_is_fatal() {
        let keyref = KeyRef::Path(PathBuf::from("/nonexistent/key.pub"));
        let err = keyref.resolve().unwrap_err();
        assert!(matches!(err, Error::KeyFile { .. }));
    }

    #[test]
    fn test_spec_scalar_and_list() {
        let one: KeySpec = serde_yaml::from_str("ssh-rsa AAAA one").unwrap();
        assert_eq!(one.resolve().unwrap(), vec!["ssh-rsa AAAA one"]);

        let many: KeySpec =
            serde_yaml::from_str("[\"ssh-rsa AAAA one\", \"ssh-ed25519 BBBB two\"]").unwrap();
        assert_eq!(
            many.resolve().unwrap(),
            vec!["ssh-rsa AAAA one", "ssh-ed25519 BBBB two"]
        );
    }

    #[test]
    fn test_spec_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("second.pub");
        std::fs::write(&path, "ssh-rsa FILE second\n").unwrap();

        let spec = KeySpec::Many(vec![
            "ssh-ed25519 LIT first".to_string(),
            path.to_string_lossy().to_string(),
        ]);
        assert_eq!(
            spec.resolve().unwrap(),
            vec!["ssh-ed25519 LIT first", "ssh-rsa FILE second"]
        );
    }

    #[test]
    fn test_rewrite_refs() {
        let mut spec = KeySpec::Many(vec!["a".to_string(), "b".to_string()]);
        spec.rewrite_refs(|raw| format!("keys/{raw}"));
        assert_eq!(
            spec.refs(),
            vec![
                KeyRef::Path(PathBuf::from("keys/a")),
                KeyRef::Path(PathBuf::from("keys/b"))
            ]
        );
    }
}
