//! Dummy command implementation.

use anyhow::Result;

use thruput_core::protocol::{Direction, PayloadKind};
use thruput_core::transfer::TransferRequest;
use thruput_core::units::format_size;

use super::DummyArgs;

/// Run the dummy command.
pub async fn run(args: DummyArgs) -> Result<()> {
    let config = super::load_config();
    let options = &args.options;

    let endpoint = options.endpoint(&config)?;
    let chunk_size = options.chunk_size(&config)?;
    let size = args.size.unwrap_or(config.transfer.dummy_size);
    let direction = Direction::from(args.direction);

    if !options.quiet && !options.json {
        let (verb, preposition) = match direction {
            Direction::Upload => ("Uploading", "to"),
            Direction::Download => ("Downloading", "from"),
        };
        crate::ui::print_banner();
        println!(
            "  {} {} of dummy data {} {} ({} byte chunks)",
            verb,
            format_size(size),
            preposition,
            endpoint,
            chunk_size
        );
        println!();
    }

    let request = TransferRequest::dummy(direction, endpoint.clone(), chunk_size, size);
    let outcome = super::execute(&config, request, options).await;

    super::report(outcome, options, |_| {
        serde_json::json!({
            "direction": direction.as_str().to_lowercase(),
            "kind": PayloadKind::Dummy.as_str().to_lowercase(),
            "server": endpoint.to_string(),
            "chunk_size": chunk_size,
        })
    })
}
