//! Cache command - Inspect and prune the local file cache
//!
//! Only cached copies without pending local edits count towards the size
//! and are evicted; evicted files are downloaded again on the next `get`.

use anyhow::Result;
use clap::Subcommand;

use crate::output::{format_bytes, OutputFormat, OutputFormatter};
use crate::session::Session;

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show the size of the evictable file cache
    Size,
    /// Evict cached files when the cache exceeds cache.max_size_mb
    Prune {
        /// Evict even when the cache is below the limit
        #[arg(long)]
        force: bool,
    },
}

impl CacheCommand {
    pub async fn execute(
        &self,
        session: &Session,
        format: OutputFormat,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let size = session.adapter.cache_size().await?;
        let limit = session.config.cache.max_size_mb * 1024 * 1024;

        match self {
            CacheCommand::Size => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "size_bytes": size,
                        "limit_bytes": limit,
                    }));
                } else {
                    println!("{} of {}", format_bytes(size), format_bytes(limit));
                }
            }
            CacheCommand::Prune { force } => {
                let evicted = if *force || size > limit {
                    session.adapter.clear_cache().await?
                } else {
                    0
                };
                tracing::info!(size, limit, evicted, "Cache pruned");

                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "evicted": evicted,
                        "size_before_bytes": size,
                        "limit_bytes": limit,
                    }));
                } else if evicted == 0 {
                    formatter.info(&format!(
                        "Cache is {} (limit {}), nothing to evict",
                        format_bytes(size),
                        format_bytes(limit)
                    ));
                } else {
                    formatter.success(&format!(
                        "Evicted {evicted} file(s), freed {}",
                        format_bytes(size)
                    ));
                }
            }
        }
        Ok(())
    }
}
