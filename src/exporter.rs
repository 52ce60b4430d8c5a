use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::{info, warn};
use url::Url;

use crate::archive;
use crate::assets::{self, AssetTask};
use crate::collections::CollectionRecords;
use crate::error::ExportError;
use crate::files::FileManager;
use crate::paths;
use crate::rewriter;
use crate::urls;

/// Some CMS hosts refuse requests with obviously non-browser agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable per-run configuration, created once and shared read-only with
/// every component.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub seed: Url,
    /// Scheme + host root of the site; the same-origin boundary.
    pub origin: Url,
    pub workers: usize,
    /// Fixed pause taken by each fetching unit after every request.
    pub delay: Duration,
    pub process_cms: bool,
    pub rewrite_css: bool,
    pub archive: bool,
}

impl SiteContext {
    pub fn new(
        seed: &str,
        workers: usize,
        delay_secs: f64,
        process_cms: bool,
        rewrite_css: bool,
        archive: bool,
    ) -> Result<Self, ExportError> {
        let trimmed = seed.trim_end_matches('/');
        let candidate = if trimmed.contains("://") { trimmed } else { seed };
        let parsed = Url::parse(candidate)
            .map_err(|e| ExportError::Config(format!("invalid seed URL `{seed}`: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExportError::Config(format!(
                "seed URL `{seed}` must use http or https"
            )));
        }
        if parsed.host_str().is_none() {
            return Err(ExportError::Config(format!("seed URL `{seed}` has no host")));
        }

        let mut origin = parsed.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Self {
            seed: parsed,
            origin,
            workers: workers.max(1),
            delay: Duration::from_secs_f64(delay_secs.max(0.0)),
            process_cms,
            rewrite_css,
            archive,
        })
    }

    /// First label of the site host, used to name the archive.
    pub fn host_label(&self) -> String {
        self.origin
            .host_str()
            .and_then(|h| h.split('.').next())
            .filter(|l| !l.is_empty())
            .unwrap_or("site")
            .to_string()
    }
}

/// Counts reported when a run completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportSummary {
    pub pages_exported: usize,
    pub pages_failed: usize,
    pub assets_downloaded: usize,
    pub assets_skipped: usize,
    pub assets_failed: usize,
    pub collections_detected: usize,
}

/// Drives the fetch -> rewrite -> discover loop to a fixed point, then the
/// CMS expansion pass, then the asset drain. Owns all mutable crawl state;
/// pages are processed one at a time, only asset downloads run in parallel.
pub struct SiteExporter {
    ctx: SiteContext,
    client: Client,
    files: FileManager,
    visited: HashSet<String>,
    frontier: VecDeque<Url>,
    tasks: HashMap<String, AssetTask>,
    records: CollectionRecords,
}

impl SiteExporter {
    pub fn new(ctx: SiteContext, output_dir: &Path) -> Result<Self, ExportError> {
        let client = build_http_client()?;
        let files = FileManager::new(output_dir)?;
        Ok(Self {
            ctx,
            client,
            files,
            visited: HashSet::new(),
            frontier: VecDeque::new(),
            tasks: HashMap::new(),
            records: CollectionRecords::default(),
        })
    }

    /// Runs the full export. Only a failure on the seed page itself is
    /// fatal; every later page or asset failure is counted and the run
    /// continues.
    pub async fn run(&mut self) -> Result<ExportSummary, ExportError> {
        info!(seed = %self.ctx.seed, "starting export");
        let mut summary = ExportSummary::default();

        self.frontier.push_back(self.ctx.seed.clone());
        let mut seed_page = true;
        while let Some(url) = self.frontier.pop_front() {
            if !self.visited.insert(urls::visited_key(&url)) {
                continue;
            }
            match self.export_page(&url, true).await {
                Ok(()) => summary.pages_exported += 1,
                Err(e) if seed_page => return Err(e),
                Err(e) => {
                    warn!(url = %url, error = %e, "page export failed");
                    summary.pages_failed += 1;
                }
            }
            seed_page = false;
        }

        if self.ctx.process_cms {
            let synthesized = self.records.expand(&self.ctx.origin);
            if !synthesized.is_empty() {
                info!(count = synthesized.len(), "crawling synthesized collection pages");
            }
            for url in synthesized {
                if !self.visited.insert(urls::visited_key(&url)) {
                    continue;
                }
                // Collection pages are leaves: no further link discovery.
                match self.export_page(&url, false).await {
                    Ok(()) => summary.pages_exported += 1,
                    Err(e) => {
                        warn!(url = %url, error = %e, "collection page export failed");
                        summary.pages_failed += 1;
                    }
                }
            }
            if let Err(e) = self.records.write_artifacts(&self.files) {
                warn!(error = %e, "could not write collection artifacts");
            }
            summary.collections_detected = self.records.collection_count();
        }

        let tasks: Vec<AssetTask> = self.tasks.values().cloned().collect();
        info!(count = tasks.len(), "downloading assets");
        let report = assets::download_all(&self.client, &self.files, &self.ctx, tasks).await;
        summary.assets_downloaded = report.downloaded;
        summary.assets_skipped = report.skipped;
        summary.assets_failed = report.failed;

        if self.ctx.archive {
            let name = format!(
                "{}-{}.zip",
                self.ctx.host_label(),
                chrono::Local::now().format("%Y%m%d-%H%M%S")
            );
            let dest = match self.files.root().parent() {
                Some(parent) => parent.join(&name),
                None => PathBuf::from(&name),
            };
            if let Err(e) = archive::archive_directory(self.files.root(), &dest) {
                warn!(error = %e, "archive creation failed");
            }
        }

        info!(
            pages = summary.pages_exported,
            assets = summary.assets_downloaded,
            "export finished"
        );
        Ok(summary)
    }

    /// Fetches one page, rewrites it, persists it, and (when `discover` is
    /// set) merges its links into the frontier and scans it for collection
    /// markers. Asset tasks are registered either way, deduplicated by
    /// remote URL.
    async fn export_page(&mut self, url: &Url, discover: bool) -> Result<(), ExportError> {
        info!(url = %url, "exporting page");
        let html = self.fetch_page(url).await?;
        let output_path = paths::page_output_path(url);
        let result = rewriter::rewrite_document(&html, url, &output_path, &self.ctx);

        if discover {
            if self.ctx.process_cms {
                self.records.scan(&result.html, url);
            }
            for link in result.links {
                if !self.visited.contains(&urls::visited_key(&link)) {
                    self.frontier.push_back(link);
                }
            }
        }
        for task in result.assets {
            self.tasks.entry(task.url.clone()).or_insert(task);
        }

        self.files.write(&output_path, result.html.as_bytes())?;
        Ok(())
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, ExportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ExportError::fetch(url.as_str(), e))?;
        if !response.status().is_success() {
            return Err(ExportError::fetch(
                url.as_str(),
                format!("HTTP {}", response.status()),
            ));
        }
        let body = response.text().await.map_err(|e| ExportError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tokio::time::sleep(self.ctx.delay).await;
        Ok(body)
    }
}

fn build_http_client() -> Result<Client, ExportError> {
    ClientBuilder::new()
        .use_rustls_tls()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ExportError::Config(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_rejects_malformed_seeds() {
        assert!(SiteContext::new("not a url", 5, 0.2, true, true, true).is_err());
        assert!(SiteContext::new("ftp://x.io", 5, 0.2, true, true, true).is_err());
        assert!(SiteContext::new("https://x.io", 5, 0.2, true, true, true).is_ok());
    }

    #[test]
    fn context_derives_origin_from_seed() {
        let ctx = SiteContext::new("https://x.io/landing?utm=1", 5, 0.2, true, true, true).unwrap();
        assert_eq!(ctx.origin.as_str(), "https://x.io/");
        assert_eq!(ctx.seed.as_str(), "https://x.io/landing?utm=1");
    }

    #[test]
    fn trailing_slash_is_trimmed_from_the_seed() {
        let ctx = SiteContext::new("https://x.io/", 5, 0.2, true, true, true).unwrap();
        assert_eq!(ctx.seed.as_str(), "https://x.io/");
        assert_eq!(ctx.host_label(), "x");
    }

    #[test]
    fn workers_are_at_least_one() {
        let ctx = SiteContext::new("https://x.io", 0, 0.0, true, true, false).unwrap();
        assert_eq!(ctx.workers, 1);
    }
}
