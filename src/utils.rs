use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::time::Instant;

pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_AWS_REGION_NAME: &str = "auto";
pub const DEFAULT_AWS_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_LOCAL_STORE_DIR: &str = "./local-store";

/// Reads `key`, treating unset and blank values the same.
pub fn get_optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn get_env_or(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

pub fn update_progress_bar(pb: &ProgressBar, start_time: &Instant) {
    pb.inc(1);
    let elapsed = start_time.elapsed().as_secs_f64();
    if elapsed > 0.0 {
        pb.set_message(format!("{:.1} batches/s", pb.position() as f64 / elapsed));
    }
}
