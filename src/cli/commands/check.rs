//! Tool availability check.

use console::style;

use crate::config::Settings;
use crate::ocr::{check_binary, OcrError, TesseractBackend};

/// Report whether tesseract, pdftoppm and the configured language are installed.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let mut ok = true;

    println!("{} Checking external tools", style("→").cyan());

    for (name, path, package) in [
        ("tesseract", &settings.tesseract_path, "tesseract-ocr"),
        ("pdftoppm", &settings.pdftoppm_path, "poppler-utils"),
    ] {
        if check_binary(path) {
            println!("  {} {} ({})", style("✓").green(), name, path.display());
        } else {
            ok = false;
            println!(
                "  {} {} not found (install {})",
                style("✗").red(),
                name,
                package
            );
        }
    }

    let backend = TesseractBackend::with_config(settings.ocr_config());
    match backend.installed_languages().await {
        Ok(languages) => {
            // "spa+eng" needs every component installed.
            let missing: Vec<&str> = settings
                .language
                .split('+')
                .filter(|lang| !languages.iter().any(|l| l == lang))
                .collect();
            if missing.is_empty() {
                println!(
                    "  {} language pack '{}'",
                    style("✓").green(),
                    settings.language
                );
            } else {
                ok = false;
                println!(
                    "  {} language pack missing: {} (installed: {})",
                    style("✗").red(),
                    missing.join(", "),
                    languages.join(", ")
                );
            }
        }
        Err(OcrError::BackendNotAvailable(_)) => {}
        Err(e) => {
            ok = false;
            println!("  {} could not list languages: {}", style("✗").red(), e);
        }
    }

    if !ok {
        anyhow::bail!("Some required tools are missing");
    }
    println!("{} Ready", style("✓").green());
    Ok(())
}
