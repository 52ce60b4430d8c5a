use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tracing::{debug, warn};

use crate::exporter::SiteContext;
use crate::files::FileManager;
use crate::paths::AssetClass;
use crate::stylesheet;

/// A pending download obligation: remote URL, the file it lands in relative
/// to the output root, and its class. Keyed by URL in the scheduler's task
/// set, so N pages referencing the same asset produce one task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetTask {
    pub url: String,
    pub local_path: String,
    pub class: AssetClass,
}

/// Counts reported by one drain of the task set.
#[derive(Debug, Default, Clone, Copy)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Downloaded,
    Skipped,
    Failed,
}

/// Drains the accumulated task set with a bounded number of concurrent
/// fetches. A task is skipped when its destination file already exists, so a
/// re-run against a populated output directory only fills gaps. Individual
/// failures are counted, never propagated.
///
/// Downloaded stylesheets are post-processed through the stylesheet
/// rewriter; assets that rewrite discovers (fonts, background images
/// referenced only from CSS) are downloaded in one follow-up wave.
pub async fn download_all(
    client: &Client,
    files: &FileManager,
    ctx: &SiteContext,
    tasks: Vec<AssetTask>,
) -> DownloadReport {
    let bar = ProgressBar::new(tasks.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}").unwrap(),
    );

    let mut known: HashSet<String> = tasks.iter().map(|t| t.url.clone()).collect();

    let (mut report, discovered) = run_wave(client, files, ctx, tasks, &bar).await;

    // Assets surfaced by stylesheet rewriting were not known to the page
    // pass; fetch the new ones in a single follow-up wave.
    let followup: Vec<AssetTask> = discovered
        .into_iter()
        .filter(|t| known.insert(t.url.clone()))
        .collect();
    if !followup.is_empty() {
        debug!(count = followup.len(), "stylesheets referenced additional assets");
        bar.inc_length(followup.len() as u64);
        let (second, _) = run_wave(client, files, ctx, followup, &bar).await;
        report.downloaded += second.downloaded;
        report.skipped += second.skipped;
        report.failed += second.failed;
    }

    bar.finish_and_clear();
    report
}

async fn run_wave(
    client: &Client,
    files: &FileManager,
    ctx: &SiteContext,
    tasks: Vec<AssetTask>,
    bar: &ProgressBar,
) -> (DownloadReport, Vec<AssetTask>) {
    let concurrency = ctx.workers.max(1);
    let results: Vec<(Outcome, Vec<AssetTask>)> = stream::iter(tasks)
        .map(|task| async move {
            let result = download_one(client, files, ctx, &task).await;
            bar.inc(1);
            result
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut report = DownloadReport::default();
    let mut discovered = Vec::new();
    for (outcome, extra) in results {
        match outcome {
            Outcome::Downloaded => report.downloaded += 1,
            Outcome::Skipped => report.skipped += 1,
            Outcome::Failed => report.failed += 1,
        }
        discovered.extend(extra);
    }
    (report, discovered)
}

async fn download_one(
    client: &Client,
    files: &FileManager,
    ctx: &SiteContext,
    task: &AssetTask,
) -> (Outcome, Vec<AssetTask>) {
    if files.exists(&task.local_path) {
        debug!(path = %task.local_path, "asset already on disk, skipping");
        return (Outcome::Skipped, Vec::new());
    }

    let response = match client.get(&task.url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(url = %task.url, error = %e, "asset request failed");
            return (Outcome::Failed, Vec::new());
        }
    };
    if !response.status().is_success() {
        warn!(url = %task.url, status = %response.status(), "asset fetch failed");
        return (Outcome::Failed, Vec::new());
    }
    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(e) => {
            warn!(url = %task.url, error = %e, "asset body read failed");
            return (Outcome::Failed, Vec::new());
        }
    };
    tokio::time::sleep(ctx.delay).await;

    if let Err(e) = files.write(&task.local_path, &bytes) {
        warn!(url = %task.url, error = %e, "asset write failed");
        return (Outcome::Failed, Vec::new());
    }
    debug!(url = %task.url, path = %task.local_path, "downloaded asset");

    if task.class == AssetClass::Stylesheet && ctx.rewrite_css {
        return (Outcome::Downloaded, postprocess_stylesheet(files, ctx, task));
    }
    (Outcome::Downloaded, Vec::new())
}

/// Reads a freshly downloaded stylesheet back, rewrites its `url(...)`
/// references relative to its own location, and writes it in place.
fn postprocess_stylesheet(
    files: &FileManager,
    ctx: &SiteContext,
    task: &AssetTask,
) -> Vec<AssetTask> {
    let source_url = match url::Url::parse(&task.url) {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };
    let css = match files.read_to_string(&task.local_path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %task.local_path, error = %e, "stylesheet read-back failed");
            return Vec::new();
        }
    };
    let rewritten = stylesheet::rewrite_css(&css, &source_url, &task.local_path, ctx);
    if rewritten.css != css {
        if let Err(e) = files.write(&task.local_path, rewritten.css.as_bytes()) {
            warn!(path = %task.local_path, error = %e, "stylesheet rewrite failed");
            return Vec::new();
        }
    }
    rewritten.tasks
}
