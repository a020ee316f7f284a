use super::{DocumentRef, DocumentStore, FileStore, Listing};
use async_trait::async_trait;
use eyre::eyre;
use std::{fs, io::ErrorKind, path::PathBuf};

const COLLECTIONS_DIR: &str = "collections";
const FILES_DIR: &str = "files";
const DOCUMENT_EXTENSION: &str = "json";

/// Directory backed stand-in for the remote stores.
///
/// Documents live in `<path>/collections/<collection>/<id>.json` and
/// stored files under `<path>/files/`, where directories act as prefixes.
#[derive(Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalStorage { path: path.into() }
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.path.join(COLLECTIONS_DIR).join(collection)
    }

    fn files_dir(&self) -> PathBuf {
        self.path.join(FILES_DIR)
    }
}

#[async_trait]
impl DocumentStore for LocalStorage {
    async fn list_documents(&self, collection: &str) -> eyre::Result<Vec<DocumentRef>> {
        let dir = self.collection_dir(collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            // A collection nobody wrote to yet is just empty
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(eyre!(
                    "Could not list collection {} in {}: {}",
                    collection,
                    dir.display(),
                    e
                ))
            }
        };

        let mut documents = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| eyre!("Could not read entry of {}: {}", collection, e))?
                .path();
            let is_document = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION);
            if let (true, Some(stem)) = (is_document, path.file_stem().and_then(|s| s.to_str())) {
                documents.push(DocumentRef::new(stem));
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    async fn commit_batch(&self, collection: &str, batch: &[DocumentRef]) -> eyre::Result<()> {
        let dir = self.collection_dir(collection);
        for document in batch {
            let path = dir.join(format!("{}.{}", document.id, DOCUMENT_EXTENSION));
            match fs::remove_file(&path) {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(eyre!(
                        "Could not delete document {} from {}: {}",
                        document.id,
                        collection,
                        e
                    ))
                }
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("local collections in {}", self.path.join(COLLECTIONS_DIR).display())
    }
}

#[async_trait]
impl FileStore for LocalStorage {
    async fn list(&self, prefix: &str) -> eyre::Result<Listing> {
        let dir = self.files_dir().join(prefix);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound && prefix.is_empty() => {
                return Ok(Listing::default())
            }
            Err(e) => return Err(eyre!("Could not list prefix '{}': {}", prefix, e)),
        };

        let mut listing = Listing::default();
        for entry in entries {
            let entry = entry.map_err(|e| eyre!("Could not read entry of '{}': {}", prefix, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry
                .file_type()
                .map_err(|e| eyre!("Could not stat '{}{}': {}", prefix, name, e))?;
            // Symlinks are leaves, even when they point at a directory
            if file_type.is_dir() {
                listing.prefixes.push(format!("{}{}/", prefix, name));
            } else {
                listing.items.push(format!("{}{}", prefix, name));
            }
        }
        listing.items.sort();
        listing.prefixes.sort();
        Ok(listing)
    }

    async fn delete(&self, key: &str) -> eyre::Result<()> {
        match fs::remove_file(self.files_dir().join(key)) {
            Ok(_) => Ok(()),
            Err(e) => Err(eyre!("Could not delete file {} with error: {}", key, e)),
        }
    }

    fn describe(&self) -> String {
        format!("local files in {}", self.files_dir().display())
    }
}

#[cfg(test)]
mod test {
    use super::LocalStorage;
    use crate::storage::{DocumentRef, DocumentStore, FileStore};
    use std::fs;

    #[tokio::test]
    async fn should_list_and_delete_documents() {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("collections").join("users");
        fs::create_dir_all(&users).unwrap();
        fs::write(users.join("alice.json"), "{}").unwrap();
        fs::write(users.join("bob.json"), "{}").unwrap();
        fs::write(users.join("notes.txt"), "ignored").unwrap();

        let storage = LocalStorage::new(dir.path());
        let documents = storage.list_documents("users").await.unwrap();
        assert_eq!(
            documents,
            vec![DocumentRef::new("alice"), DocumentRef::new("bob")]
        );

        storage.commit_batch("users", &documents).await.unwrap();
        assert!(storage.list_documents("users").await.unwrap().is_empty());
        // The collection itself survives
        assert!(users.is_dir());
    }

    #[tokio::test]
    async fn should_treat_missing_collection_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.list_documents("cvs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_list_direct_children_only() {
        let dir = tempfile::tempdir().unwrap();
        let files = dir.path().join("files");
        fs::create_dir_all(files.join("avatars").join("thumbs")).unwrap();
        fs::write(files.join("a.pdf"), "a").unwrap();
        fs::write(files.join("avatars").join("u1.png"), "u1").unwrap();
        fs::write(files.join("avatars").join("thumbs").join("u1.png"), "t").unwrap();

        let storage = LocalStorage::new(dir.path());
        let root = storage.list("").await.unwrap();
        assert_eq!(root.items, vec!["a.pdf".to_string()]);
        assert_eq!(root.prefixes, vec!["avatars/".to_string()]);

        let avatars = storage.list("avatars/").await.unwrap();
        assert_eq!(avatars.items, vec!["avatars/u1.png".to_string()]);
        assert_eq!(avatars.prefixes, vec!["avatars/thumbs/".to_string()]);

        storage.delete("avatars/u1.png").await.unwrap();
        assert!(storage.list("avatars/").await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn should_fail_to_delete_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.delete("nope.pdf").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn should_treat_directory_symlink_as_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = dir.path().join("files");
        fs::create_dir_all(files.join("cvs")).unwrap();
        fs::write(files.join("cvs").join("a.pdf"), "a").unwrap();
        std::os::unix::fs::symlink(&files, files.join("loop")).unwrap();

        let storage = LocalStorage::new(dir.path());
        let root = storage.list("").await.unwrap();
        assert_eq!(root.items, vec!["loop".to_string()]);
        assert_eq!(root.prefixes, vec!["cvs/".to_string()]);

        storage.delete("loop").await.unwrap();
        assert!(fs::symlink_metadata(files.join("loop")).is_err());
        // The link target is untouched
        assert!(files.join("cvs").join("a.pdf").is_file());
    }
}
