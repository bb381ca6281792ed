//! UI utilities for Thruput CLI.

use std::time::Duration;

use thruput_core::units::format_size;

const BAR_WIDTH: usize = 30;

/// Print the version banner shown before a transfer.
pub fn print_banner() {
    println!();
    println!("Thruput v{}", thruput_core::VERSION);
    println!("{}", "-".repeat(37));
    println!();
}

/// Render a progress bar line such as `[#######-------]  40.00%`.
pub fn progress_line(percent: f64) -> String {
    let percent = percent.clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>6.2}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

/// Format an elapsed duration as `850 ms`, `12.34 s` or `3m 05s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1000 {
        format!("{} ms", ms)
    } else if elapsed.as_secs() < 60 {
        format!("{:.2} s", elapsed.as_secs_f64())
    } else {
        let secs = elapsed.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Format a throughput, or `--` when it is unknown.
pub fn format_rate(bytes_per_second: Option<u64>) -> String {
    bytes_per_second.map_or_else(|| "--".to_string(), |bps| format!("{}/s", format_size(bps)))
}
