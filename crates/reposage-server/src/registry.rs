//! Repository registry: ids, display names, owners and document counters,
//! persisted as JSON next to the vector index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reposage_core::{Error, Result};

/// Bookkeeping for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub repo_id: String,
    pub repo_name: String,
    pub user_id: String,
    /// Documents successfully ingested into the repository.
    pub no_docs: u64,
    pub created_at: DateTime<Utc>,
}

pub struct RepoRegistry {
    path: PathBuf,
    repos: RwLock<BTreeMap<String, RepositoryRecord>>,
}

impl RepoRegistry {
    /// Load the registry from `path`. A missing file starts empty; an
    /// unreadable one is logged and also starts empty.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let repos = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Vec<RepositoryRecord>>(&data) {
                Ok(records) => records
                    .into_iter()
                    .map(|r| (r.repo_id.clone(), r))
                    .collect(),
                Err(e) => {
                    warn!("Ignoring invalid registry {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        info!("Loaded {} repositories from {}", repos.len(), path.display());

        Self {
            path,
            repos: RwLock::new(repos),
        }
    }

    fn save(&self, repos: &BTreeMap<String, RepositoryRecord>) -> Result<()> {
        let records: Vec<&RepositoryRecord> = repos.values().collect();
        let data = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    /// Register a new repository for `user_id`.
    ///
    /// `provision` receives the fresh id and runs before the record is
    /// stored; if it fails nothing is registered.
    pub fn create(
        &self,
        repo_name: &str,
        user_id: &str,
        provision: impl FnOnce(&str) -> Result<()>,
    ) -> Result<RepositoryRecord> {
        let repo_name = repo_name.trim();
        if repo_name.is_empty() || user_id.trim().is_empty() {
            return Err(Error::InvalidRequest("repo_name and user_id are required".into()));
        }

        let mut repos = self.repos.write();
        if repos
            .values()
            .any(|r| r.user_id == user_id && r.repo_name == repo_name)
        {
            return Err(Error::InvalidRequest(
                "Repository name already exists for this user".into(),
            ));
        }

        let mut repo_id = new_repo_id();
        while repos.contains_key(&repo_id) {
            repo_id = new_repo_id();
        }
        provision(&repo_id)?;

        let record = RepositoryRecord {
            repo_id: repo_id.clone(),
            repo_name: repo_name.to_string(),
            user_id: user_id.to_string(),
            no_docs: 0,
            created_at: Utc::now(),
        };
        repos.insert(repo_id, record.clone());
        self.save(&repos)?;

        info!("Created repository {} ({}) for {}", record.repo_id, record.repo_name, user_id);
        Ok(record)
    }

    /// Repositories owned by `user_id`, oldest first.
    pub fn list_for_user(&self, user_id: &str) -> Vec<RepositoryRecord> {
        let mut records: Vec<RepositoryRecord> = self
            .repos
            .read()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.repo_id.cmp(&b.repo_id)));
        records
    }

    pub fn get(&self, repo_id: &str) -> Option<RepositoryRecord> {
        self.repos.read().get(repo_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.repos.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.read().is_empty()
    }

    /// Count one ingested document against `repo_id`, registering the
    /// repository first if it was never created through [`create`](Self::create).
    pub fn record_document(
        &self,
        repo_id: &str,
        repo_name: &str,
        user_id: &str,
    ) -> Result<RepositoryRecord> {
        let mut repos = self.repos.write();
        let record = repos.entry(repo_id.to_string()).or_insert_with(|| {
            info!("Registering repository {} on first upload", repo_id);
            RepositoryRecord {
                repo_id: repo_id.to_string(),
                repo_name: repo_name.to_string(),
                user_id: user_id.to_string(),
                no_docs: 0,
                created_at: Utc::now(),
            }
        });
        record.no_docs += 1;
        let record = record.clone();
        self.save(&repos)?;
        Ok(record)
    }
}

fn new_repo_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("repo_{}", &hex[..8])
}
