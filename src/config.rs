use clap::ValueEnum;
use std::str::FromStr;

use crate::error::PurgeError;
use crate::utils;

/// Collections wiped by a run, in processing order.
pub const TARGET_COLLECTIONS: [&str; 7] = [
    "users",
    "cvs",
    "shared_cvs",
    "cv_views",
    "cv_conversions",
    "recruiter_profiles",
    "viewed_cvs",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Firestore for documents, the S3-compatible bucket for files
    Firestore,
    /// Directory tree under LOCAL_STORE_DIR
    Local,
}

impl FromStr for Backend {
    type Err = PurgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firestore" => Ok(Backend::Firestore),
            "local" => Ok(Backend::Local),
            other => Err(PurgeError::Config(format!(
                "Unknown PURGE_BACKEND '{}', expected 'firestore' or 'local'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend: Backend,
    pub collections: Vec<String>,
    pub firestore_endpoint: String,
    pub firestore_project_id: Option<String>,
    pub firestore_access_token: Option<String>,
    pub storage_bucket: Option<String>,
    pub aws_region_name: String,
    pub aws_endpoint: String,
    pub local_store_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Config, PurgeError> {
        dotenv::dotenv().ok();

        let backend = match utils::get_optional_env("PURGE_BACKEND") {
            Some(value) => value.parse()?,
            None => Backend::Firestore,
        };

        Ok(Config {
            backend,
            collections: TARGET_COLLECTIONS.iter().map(|c| c.to_string()).collect(),
            firestore_endpoint: utils::get_env_or(
                "FIRESTORE_ENDPOINT",
                utils::DEFAULT_FIRESTORE_ENDPOINT,
            ),
            firestore_project_id: utils::get_optional_env("FIRESTORE_PROJECT_ID"),
            firestore_access_token: utils::get_optional_env("FIRESTORE_ACCESS_TOKEN"),
            storage_bucket: utils::get_optional_env("STORAGE_BUCKET"),
            aws_region_name: utils::get_env_or("AWS_REGION_NAME", utils::DEFAULT_AWS_REGION_NAME),
            aws_endpoint: utils::get_env_or("AWS_ENDPOINT", utils::DEFAULT_AWS_ENDPOINT),
            local_store_dir: utils::get_env_or("LOCAL_STORE_DIR", utils::DEFAULT_LOCAL_STORE_DIR),
        })
    }

    pub fn with_backend(mut self, backend: Option<Backend>) -> Config {
        if let Some(backend) = backend {
            self.backend = backend;
        }
        self
    }
}
