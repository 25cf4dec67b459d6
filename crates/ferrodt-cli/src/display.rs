//! Terminal output for the ferrodt CLI

use console::style;
use ferrodt_engine::{ExtensionRegistry, RunSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a run is in progress
pub fn create_spinner(quiet: bool, message: &str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(template);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Print the per-operation results of a completed run
pub fn display_run_summary(summary: &RunSummary) {
    println!(
        "{} Transfer completed in {}",
        style("✓").green().bold(),
        style(format_duration(summary.elapsed)).cyan()
    );
    for op in &summary.operations {
        println!(
            "  #{} {} → {}: {} items in {}",
            op.index,
            style(&op.source).cyan(),
            style(&op.sink).cyan(),
            style(op.items).green(),
            format_duration(op.elapsed)
        );
    }
    println!(
        "  Total: {} items across {} operation(s)",
        style(summary.total_items()).green().bold(),
        summary.operations.len()
    );
}

/// Explain which keys must be configured
pub fn display_missing_configuration(keys: &[String]) {
    eprintln!(
        "{} Missing required configuration: {}",
        style("✗").red().bold(),
        style(keys.join(", ")).yellow()
    );
    eprintln!(
        "  Set {} and {} in the settings file, through FERRODT__SOURCE / FERRODT__SINK, \
         or with --source / --sink",
        style("Source").bold(),
        style("Sink").bold()
    );
}

/// Report a run that failed
pub fn display_fault(error: &anyhow::Error) {
    eprintln!("{} {:#}", style("✗").red().bold(), error);
}

/// Print registered extensions grouped by capability
pub fn display_extensions(registry: &ExtensionRegistry) {
    for (label, names) in [
        ("Sources", registry.source_names()),
        ("Sinks", registry.sink_names()),
    ] {
        println!("{}", style(label).bold().underlined());
        if names.is_empty() {
            println!("  {}", style("(none)").dim());
        }
        for name in names {
            println!("  • {}", style(name).cyan());
        }
    }
}

/// Format duration in human readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
