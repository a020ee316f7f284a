extern crate rusoto_core;
extern crate rusoto_s3;
use async_trait::async_trait;
use eyre::eyre;
use rusoto_core::Region;
use rusoto_s3::{DeleteObjectRequest, ListObjectsV2Request, S3Client, S3};
use tracing::debug;

use super::{FileStore, Listing};
use crate::config::Config;

const DELIMITER: &str = "/";

#[derive(Clone)]
pub struct S3Storage {
    bucket_name: String,
    s3_client: S3Client,
}

impl S3Storage {
    pub fn new(region: Region, bucket_name: &str) -> Self {
        S3Storage::with_client(S3Client::new(region), bucket_name)
    }

    pub fn with_client(s3_client: S3Client, bucket_name: &str) -> Self {
        S3Storage {
            bucket_name: bucket_name.to_owned(),
            s3_client,
        }
    }

    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let bucket_name = config
            .storage_bucket
            .as_deref()
            .ok_or_else(|| eyre!("STORAGE_BUCKET is required for the firestore backend"))?;
        let region = Region::Custom {
            name: config.aws_region_name.clone(),
            endpoint: config.aws_endpoint.clone(),
        };
        Ok(S3Storage::new(region, bucket_name))
    }
}

#[async_trait]
impl FileStore for S3Storage {
    async fn list(&self, prefix: &str) -> eyre::Result<Listing> {
        let mut listing = Listing::default();
        let mut continuation_token = None;

        loop {
            let list_req = ListObjectsV2Request {
                bucket: self.bucket_name.to_string(),
                prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
                delimiter: Some(DELIMITER.to_string()),
                continuation_token: continuation_token.take(),
                ..Default::default()
            };

            let output = match self.s3_client.list_objects_v2(list_req).await {
                Ok(output) => output,
                Err(e) => return Err(eyre!("Could not list prefix '{}': {}", prefix, e)),
            };

            listing.items.extend(
                output
                    .contents
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|object| object.key),
            );
            listing.prefixes.extend(
                output
                    .common_prefixes
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|common| common.prefix),
            );

            match (output.is_truncated, output.next_continuation_token) {
                (Some(true), Some(token)) => continuation_token = Some(token),
                _ => break,
            }
        }

        debug!(
            prefix,
            items = listing.items.len(),
            prefixes = listing.prefixes.len(),
            "listed bucket prefix"
        );
        Ok(listing)
    }

    async fn delete(&self, key: &str) -> eyre::Result<()> {
        let delete_req = DeleteObjectRequest {
            bucket: self.bucket_name.to_string(),
            key: key.to_string(),
            ..Default::default()
        };

        match self.s3_client.delete_object(delete_req).await {
            Ok(_) => Ok(()),
            Err(e) => Err(eyre!("Could not delete file {}: {}", key, e)),
        }
    }

    fn describe(&self) -> String {
        format!("bucket '{}'", self.bucket_name)
    }
}
