//! Directory-backed object store.
//!
//! Keys are `/`-separated paths relative to the root. Listing walks the whole
//! tree and returns it as a single page sorted by key.

use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;

use super::{ObjectBody, ObjectMeta, ObjectPage, ObjectStore, StoreError, content_type_for_key};

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Map a key to a path under the root, refusing anything that could escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(relative))
    }
}

async fn walk(root: &Path) -> Result<Vec<ObjectMeta>, StoreError> {
    let mut out = Vec::new();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative) = pending.pop() {
        let mut entries = tokio::fs::read_dir(root.join(&relative)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let child = relative.join(entry.file_name());
            if file_type.is_dir() {
                pending.push(child);
            } else if file_type.is_file() {
                let Some(key) = key_for(&child) else {
                    continue;
                };
                let size = entry.metadata().await?.len();
                out.push(ObjectMeta { key, size, last_modified: None, etag: None });
            }
        }
    }

    out.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(out)
}

/// Key for a relative path; `None` for names that are not valid UTF-8.
fn key_for(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

#[async_trait::async_trait]
impl ObjectStore for LocalStore {
    async fn list_page(&self, _token: Option<&str>) -> Result<ObjectPage, StoreError> {
        let objects = walk(&self.root).await?;
        Ok(ObjectPage { objects, next_token: None })
    }

    async fn get(&self, key: &str) -> Result<ObjectBody, StoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(ObjectBody {
                bytes: Bytes::from(bytes),
                content_type: Some(content_type_for_key(key).to_owned()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(key.to_owned())),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
#[path = "local_test.rs"]
mod tests;
