//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so the server crate can prepare the
//! data directory without depending directly on `common`.

/// Ensure the data directory exists; warn on a missing static directory.
pub async fn ensure_env(static_dir: &str, data_file: &str) -> anyhow::Result<()> {
    common::env::ensure_env(static_dir, data_file).await
}
