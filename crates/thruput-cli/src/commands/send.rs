//! Send command implementation.

use anyhow::{Context, Result};

use thruput_core::transfer::TransferRequest;
use thruput_core::units::format_size;

use super::SendArgs;

/// Run the send command.
pub async fn run(args: SendArgs) -> Result<()> {
    let config = super::load_config();
    let options = &args.options;

    let endpoint = options.endpoint(&config)?;
    let chunk_size = options.chunk_size(&config)?;

    let request = TransferRequest::upload_path(endpoint.clone(), chunk_size, &args.file)
        .await
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let file_name = request.file_name.clone().unwrap_or_default();

    if !options.quiet && !options.json {
        crate::ui::print_banner();
        println!(
            "  Sending {} ({}) to {}",
            file_name,
            format_size(request.total_size),
            endpoint
        );
        println!();
    }

    let outcome = super::execute(&config, request, options).await;

    super::report(outcome, options, |_| {
        serde_json::json!({
            "direction": "upload",
            "kind": "file",
            "server": endpoint.to_string(),
            "chunk_size": chunk_size,
            "file_name": file_name,
        })
    })
}
