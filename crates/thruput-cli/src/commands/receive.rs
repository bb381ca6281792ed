//! Receive command implementation.

use std::path::PathBuf;

use anyhow::Result;

use thruput_core::transfer::TransferRequest;

use super::ReceiveArgs;

/// Run the receive command.
pub async fn run(args: ReceiveArgs) -> Result<()> {
    let config = super::load_config();
    let options = &args.options;

    let endpoint = options.endpoint(&config)?;
    let chunk_size = options.chunk_size(&config)?;
    let output_dir = args
        .output
        .or_else(|| config.transfer.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    if !options.quiet && !options.json {
        crate::ui::print_banner();
        println!(
            "  Receiving from {} into {}",
            endpoint,
            output_dir.display()
        );
        println!();
    }

    let request = TransferRequest::download(endpoint.clone(), chunk_size, &output_dir);
    let outcome = super::execute(&config, request, options).await;

    if let Ok(result) = &outcome {
        if let (Some(path), false) = (&result.path, options.quiet || options.json) {
            println!();
            println!("  Saved to {}", path.display());
        }
    }

    super::report(outcome, options, |result| {
        serde_json::json!({
            "direction": "download",
            "kind": "file",
            "server": endpoint.to_string(),
            "chunk_size": chunk_size,
            "file_name": result.file_name,
            "path": result.path.as_ref().map(|p| p.display().to_string()),
        })
    })
}
