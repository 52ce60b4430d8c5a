use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use snapsite::cli::ExportArgs;
use snapsite::exporter::{ExportSummary, SiteContext, SiteExporter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ExportArgs::parse();
    init_logging(&args)?;

    let ctx = SiteContext::new(
        &args.url,
        args.workers,
        args.delay,
        !args.no_cms,
        !args.no_css_rewrite,
        !args.no_archive,
    )?;

    let mut exporter = SiteExporter::new(ctx, &args.output_dir)?;
    let summary = exporter.run().await.context("export failed")?;

    if !args.quiet {
        print_summary(&args, &summary);
    }
    Ok(())
}

fn init_logging(args: &ExportArgs) -> Result<()> {
    let level = if args.verbose {
        "snapsite=debug"
    } else if args.quiet {
        "snapsite=error"
    } else {
        "snapsite=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn print_summary(args: &ExportArgs, summary: &ExportSummary) {
    println!("\n{}", "Export summary".bold());
    println!("  Site URL:          {}", args.url.blue());
    println!("  Output directory:  {}", args.output_dir.display());
    println!("  Workers:           {}", args.workers);
    println!("  Delay:             {}s", args.delay);
    println!(
        "  CMS processing:    {}",
        if args.no_cms { "disabled".yellow() } else { "enabled".green() }
    );
    println!(
        "  CSS rewriting:     {}",
        if args.no_css_rewrite { "disabled".yellow() } else { "enabled".green() }
    );
    println!(
        "  Pages exported:    {} ({} failed)",
        summary.pages_exported.to_string().green(),
        summary.pages_failed
    );
    println!(
        "  Assets downloaded: {} ({} skipped, {} failed)",
        summary.assets_downloaded.to_string().green(),
        summary.assets_skipped,
        summary.assets_failed
    );
    if !args.no_cms {
        println!("  Collections found: {}", summary.collections_detected);
    }
}
