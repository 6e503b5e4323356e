//! Web server command.

use console::style;

use crate::config::{parse_bind_address, Settings};

/// Start the web server.
pub async fn cmd_serve(settings: &mut Settings, bind: Option<&str>) -> anyhow::Result<()> {
    if let Some(bind) = bind {
        let (host, port) = parse_bind_address(bind, settings.port);
        settings.host = host;
        settings.port = port;
    }

    println!(
        "{} Starting cedula-ocr server at http://{}:{}",
        style("→").cyan(),
        settings.host,
        settings.port
    );
    println!(
        "  OCR language: {}, upload limit: {} bytes",
        style(&settings.language).bold(),
        settings.max_upload_bytes
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings).await
}
