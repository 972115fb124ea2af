//! PDF Stamper CLI tool
//!
//! Stamps the header, watermark and footer images onto every PDF found in
//! `input_pdfs/` and writes the results to `output_pdfs/`.

use anyhow::{bail, Context};
use clap::Parser;
use std::process;

use pdf_stamper::batch::{run_batch, BatchLayout};

/// PDF Stamper - Overlay header, watermark and footer images onto PDFs
#[derive(Parser)]
#[command(name = "pdf-stamper")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "LAYOUT (relative to the working directory):
    input_pdfs/            PDFs to stamp
    output_pdfs/           Stamped copies, same file names
    temp_files/            Scratch space, removed when empty
    images/header.jpg      Top-right corner, 3.46in x 0.781in
    images/watermark.png   Page center, 15% opacity
    images/footer.jpg      Bottom edge, 1in high

Set RUST_LOG to override the log filter.")]
struct Cli {
    /// Log per-page geometry
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let layout = BatchLayout::default();
    let summary = run_batch(&layout)
        .with_context(|| format!("Cannot process {}", layout.input_dir.display()))?;

    // Each failed file was already logged at error level while stamping
    if !summary.is_success() {
        bail!("{} of {} files failed", summary.failed.len(), summary.total());
    }

    println!("Stamped {} PDF files", summary.stamped.len());
    Ok(())
}
