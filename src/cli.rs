use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "snapsite",
    about = "Export a CMS-rendered website into a self-contained static snapshot",
    version,
    long_about = "Crawls a site from a seed URL, rewrites every same-origin link and asset \
reference to point at locally-downloaded copies, discovers CMS collection pages that are \
not linked from the navigation, and optionally packs the result into a ZIP archive."
)]
pub struct ExportArgs {
    /// Seed URL of the site to export
    #[arg(required = true)]
    pub url: String,

    /// Output directory for the exported site
    #[arg(short, long, default_value = "./site-export")]
    pub output_dir: PathBuf,

    /// Maximum number of concurrent asset download workers
    #[arg(short = 'w', long, default_value_t = 5)]
    pub workers: usize,

    /// Delay between requests in seconds, applied per fetching worker
    #[arg(short = 'd', long, default_value_t = 0.2)]
    pub delay: f64,

    /// Disable discovery and crawling of CMS collection pages
    #[arg(long)]
    pub no_cms: bool,

    /// Keep stylesheet URLs pointing at their original remote locations
    #[arg(long)]
    pub no_css_rewrite: bool,

    /// Skip creating a ZIP archive of the exported site
    #[arg(long)]
    pub no_archive: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write log output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
