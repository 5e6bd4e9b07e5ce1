use std::collections::BTreeMap;
use std::sync::Arc;

use sha2::Digest as _;

use crate::error::{RenderError, RenderResult};

/// Raw font bytes registered under a template-visible family name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    name: String,
    bytes: Arc<Vec<u8>>,
    digest: String,
}

impl FontFace {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let digest = sha256_hex(&bytes);
        Self {
            name: name.into(),
            bytes: Arc::new(bytes),
            digest,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex SHA-256 of the bytes. Faces with equal digests share one registration.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Loaded fonts by case-insensitive family name, in load order.
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    by_name: BTreeMap<String, Arc<FontFace>>,
    order: Vec<Arc<FontFace>>,
}

impl FontTable {
    pub fn insert(&mut self, face: FontFace) -> RenderResult<()> {
        let key = face.name().to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(RenderError::render(format!(
                "font family '{}' is declared more than once",
                face.name()
            )));
        }
        let face = Arc::new(face);
        self.by_name.insert(key, Arc::clone(&face));
        self.order.push(face);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<FontFace>> {
        self.by_name.get(&name.trim().to_lowercase())
    }

    /// The first loaded font, used when nothing names a family.
    pub fn first(&self) -> Option<&Arc<FontFace>> {
        self.order.first()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FontFace>> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut t = FontTable::default();
        t.insert(FontFace::new("Roboto", vec![1, 2, 3])).unwrap();
        assert_eq!(t.get("roboto").unwrap().name(), "Roboto");
        assert_eq!(t.first().unwrap().name(), "Roboto");
        assert!(t.get("Arial").is_none());
    }

    #[test]
    fn duplicate_family_is_rejected() {
        let mut t = FontTable::default();
        t.insert(FontFace::new("Roboto", vec![1])).unwrap();
        assert!(t.insert(FontFace::new("ROBOTO", vec![2])).is_err());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn digest_is_sha256() {
        let f = FontFace::new("x", b"abc".to_vec());
        assert_eq!(
            f.digest(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
