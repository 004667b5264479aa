//! Collection router: repository id → isolated collection.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::index::{CollectionHandle, VectorIndex};
use reposage_core::{Error, Result};

const MAX_PLAIN_ID_LEN: usize = 64;

/// Maps repository ids onto collections of a `VectorIndex`.
///
/// Handles are never cached: each `resolve` goes back to the index, so a
/// collection recreated behind the router's back is picked up on the next call.
#[derive(Clone)]
pub struct CollectionRouter {
    index: Arc<dyn VectorIndex>,
}

impl CollectionRouter {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Deterministic collection name for a repository id.
    ///
    /// Ids made of `[A-Za-z0-9_-]` (up to 64 chars) keep their spelling under
    /// an `rs_` prefix; anything else is hashed under `rh_`. The two prefixes
    /// never collide.
    pub fn collection_name(repository_id: &str) -> Result<String> {
        if repository_id.is_empty() {
            return Err(Error::InvalidRequest("repository id must not be empty".into()));
        }

        let plain = repository_id.len() <= MAX_PLAIN_ID_LEN
            && repository_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if plain {
            Ok(format!("rs_{repository_id}"))
        } else {
            let digest = hex::encode(Sha256::digest(repository_id.as_bytes()));
            Ok(format!("rh_{}", &digest[..32]))
        }
    }

    /// Resolve (and lazily create) the collection for a repository.
    pub fn resolve(&self, repository_id: &str) -> Result<CollectionHandle> {
        let name = Self::collection_name(repository_id)?;
        if self.index.create_if_absent(&name)? {
            info!(
                "Provisioned collection {} for repository {} ({})",
                name,
                repository_id,
                self.index.backend()
            );
        } else {
            debug!("Resolved collection {} for repository {}", name, repository_id);
        }
        Ok(CollectionHandle::new(name, repository_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryIndex;

    #[test]
    fn test_plain_ids_keep_spelling() {
        assert_eq!(
            CollectionRouter::collection_name("repo_1a2b3c4d").unwrap(),
            "rs_repo_1a2b3c4d"
        );
    }

    #[test]
    fn test_other_ids_are_hashed_deterministically() {
        let a = CollectionRouter::collection_name("team/finance docs").unwrap();
        let b = CollectionRouter::collection_name("team/finance docs").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("rh_"));
        assert_eq!(a.len(), 3 + 32);
        assert_ne!(a, CollectionRouter::collection_name("team/finance-docs").unwrap());
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(matches!(
            CollectionRouter::collection_name(""),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let index = Arc::new(InMemoryIndex::new(8));
        let router = CollectionRouter::new(index.clone());

        let first = router.resolve("repo_a").unwrap();
        let second = router.resolve("repo_a").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.repository_id(), "repo_a");
        assert_eq!(index.list_collections().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_recreates_dropped_collection() {
        let index = Arc::new(InMemoryIndex::new(8));
        let router = CollectionRouter::new(index.clone());

        let handle = router.resolve("repo_a").unwrap();
        assert!(index.drop_collection(handle.name()));
        assert!(index.collection_size(&handle).is_err());

        let again = router.resolve("repo_a").unwrap();
        assert_eq!(index.collection_size(&again).unwrap(), 0);
    }
}
