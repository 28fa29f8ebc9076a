use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::policy::PolicyTopic;
use crate::errors::ServiceError;

/// Source of official policy text, keyed by topic.
#[async_trait]
pub trait PolicyLibrary: Send + Sync {
    async fn fetch(&self, topic: PolicyTopic) -> Result<String, ServiceError>;
}

/// Reads `<directory>/<topic>.md` on every fetch so edited policies apply
/// without a restart.
#[derive(Clone, Debug)]
pub struct FsPolicyLibrary {
    directory: PathBuf,
}

impl FsPolicyLibrary {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, topic: PolicyTopic) -> PathBuf {
        self.directory.join(topic.file_name())
    }
}

#[async_trait]
impl PolicyLibrary for FsPolicyLibrary {
    async fn fetch(&self, topic: PolicyTopic) -> Result<String, ServiceError> {
        let path = self.path_for(topic);
        let text = tokio::fs::read_to_string(&path).await.map_err(|source| {
            ServiceError::PolicyUnavailable { topic, detail: format!("{}: {source}", path.display()) }
        })?;

        if text.trim().is_empty() {
            return Err(ServiceError::PolicyUnavailable {
                topic,
                detail: format!("{} is empty", path.display()),
            });
        }
        Ok(text)
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryPolicyLibrary {
    documents: HashMap<PolicyTopic, String>,
}

impl InMemoryPolicyLibrary {
    pub fn with_document(mut self, topic: PolicyTopic, text: impl Into<String>) -> Self {
        self.documents.insert(topic, text.into());
        self
    }
}

#[async_trait]
impl PolicyLibrary for InMemoryPolicyLibrary {
    async fn fetch(&self, topic: PolicyTopic) -> Result<String, ServiceError> {
        self.documents.get(&topic).cloned().ok_or_else(|| ServiceError::PolicyUnavailable {
            topic,
            detail: "no document registered".to_string(),
        })
    }
}
