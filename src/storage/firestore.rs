use std::future::Future;

use async_trait::async_trait;
use eyre::eyre;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DocumentRef, DocumentStore, MAX_BATCH_SIZE};
use crate::config::Config;

const PAGE_SIZE: usize = 300;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Document {
    name: String,
}

#[derive(Serialize, Debug)]
struct CommitRequest<'a> {
    writes: Vec<Write<'a>>,
}

#[derive(Serialize, Debug)]
struct Write<'a> {
    delete: &'a str,
}

/// Follows page tokens until the listing is exhausted, so callers get the
/// whole collection before deleting anything.
async fn drain_pages<F, Fut>(mut fetch_page: F) -> eyre::Result<Vec<DocumentRef>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = eyre::Result<ListDocumentsResponse>>,
{
    let mut documents = Vec::new();
    let mut page_token = None;

    loop {
        let page = fetch_page(page_token.take()).await?;
        documents.extend(page.documents.into_iter().map(|doc| DocumentRef::new(doc.name)));

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(documents)
}

/// Document store backed by the Firestore REST API.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    endpoint: String,
    project_id: String,
    access_token: String,
}

impl FirestoreStore {
    pub fn new(endpoint: &str, project_id: &str, access_token: &str) -> Self {
        FirestoreStore {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            project_id: project_id.to_owned(),
            access_token: access_token.to_owned(),
        }
    }

    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let project_id = config
            .firestore_project_id
            .as_deref()
            .ok_or_else(|| eyre!("FIRESTORE_PROJECT_ID is required for the firestore backend"))?;
        let access_token = config
            .firestore_access_token
            .as_deref()
            .ok_or_else(|| eyre!("FIRESTORE_ACCESS_TOKEN is required for the firestore backend"))?;
        Ok(FirestoreStore::new(
            &config.firestore_endpoint,
            project_id,
            access_token,
        ))
    }

    async fn fetch_page(
        &self,
        url: &str,
        collection: &str,
        page_token: Option<String>,
    ) -> eyre::Result<ListDocumentsResponse> {
        let mut query = vec![
            ("pageSize", PAGE_SIZE.to_string()),
            ("mask.fieldPaths", "__name__".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| eyre!("Could not list collection {}: {}", collection, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!(
                "Listing collection {} failed with {}: {}",
                collection,
                status,
                body
            ));
        }

        response
            .json()
            .await
            .map_err(|e| eyre!("Could not decode listing of {}: {}", collection, e))
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.endpoint, self.project_id
        )
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list_documents(&self, collection: &str) -> eyre::Result<Vec<DocumentRef>> {
        let url = format!("{}/{}", self.documents_root(), collection);
        let documents =
            drain_pages(|page_token| self.fetch_page(&url, collection, page_token)).await?;

        debug!(collection, count = documents.len(), "listed collection");
        Ok(documents)
    }

    async fn commit_batch(&self, collection: &str, batch: &[DocumentRef]) -> eyre::Result<()> {
        if batch.len() > MAX_BATCH_SIZE {
            return Err(eyre!(
                "Batch of {} deletes exceeds the limit of {}",
                batch.len(),
                MAX_BATCH_SIZE
            ));
        }

        let body = CommitRequest {
            writes: batch.iter().map(|doc| Write { delete: &doc.id }).collect(),
        };

        let response = self
            .client
            .post(format!("{}:commit", self.documents_root()))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| eyre!("Could not commit batch for {}: {}", collection, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(eyre!(
                "Batch commit for {} failed with {}: {}",
                collection,
                status,
                body
            ))
        }
    }

    fn describe(&self) -> String {
        format!("firestore project '{}'", self.project_id)
    }
}
