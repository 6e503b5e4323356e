//! Local extraction command.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncReadExt;

use crate::config::Settings;
use crate::server::ExtractionResponse;
use crate::storage::{sanitize_extension, DocumentKind};

/// Run the pipeline on a local file and print the result.
pub async fn cmd_extract(settings: &Settings, file: &Path, json: bool) -> anyhow::Result<()> {
    if !file.is_file() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let scratch_space = settings.scratch_space();
    scratch_space.ensure_root()?;
    let scratch = scratch_space.request_dir()?;

    // Work on a copy so rasterized pages never land next to the user's file.
    let extension = file
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(sanitize_extension);
    let input = scratch.upload_path(extension.as_deref());
    tokio::fs::copy(file, &input)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut head = [0u8; 16];
    let read = tokio::fs::File::open(&input).await?.read(&mut head).await?;
    let kind = DocumentKind::detect(extension.as_deref(), &head[..read]);

    let pipeline = settings.build_pipeline();

    let pb = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    pb.set_message(format!(
        "Running OCR on {} ({})...",
        file.display(),
        kind
    ));

    let result = pipeline.process(&input, kind, scratch.path()).await;
    pb.finish_and_clear();

    let result = result.with_context(|| format!("Failed to process {}", file.display()))?;

    if json {
        let response = ExtractionResponse::from(result);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!(
        "{} Processed {} ({} page(s))",
        style("✓").green(),
        style(file.display()).bold(),
        result.pages
    );
    match result.cedula {
        Some(ref cedula) => println!("  Cédula: {}", style(cedula).green().bold()),
        None => println!("  Cédula: {}", style("not found").yellow()),
    }
    println!();
    if result.text.is_empty() {
        println!("{}", style("(no text recognized)").dim());
    } else {
        println!("{}", result.text);
    }

    Ok(())
}
