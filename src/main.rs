use clap::Parser;
use scanmerge::cli::{Cli, Commands};
use scanmerge::config::CliOverrides;
use scanmerge::logging::init_logging;
use scanmerge::{MergeError, cli::commands};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {e}");
        // Continue without logging rather than refusing to run.
    }

    let overrides = CliOverrides {
        db: cli.db.clone(),
        batch_size: None,
        lock_timeout_ms: cli.lock_timeout,
    };

    let result = match cli.command {
        Commands::Init { force } => commands::init::execute(force, cli.json, &overrides),
        Commands::Rules { command } => commands::rules::execute(&command, cli.json, &overrides),
        Commands::Reconcile(args) => commands::reconcile::execute(&args, cli.json, &overrides),
        Commands::Show { keys } => commands::show::execute(&keys, cli.json, &overrides),
        Commands::History { key } => commands::history::execute(&key, cli.json, &overrides),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Print the error (JSON when requested) and exit non-zero. A fatal
/// reconciliation error names the first failing issue.
fn handle_error(err: &MergeError, json_mode: bool) -> ! {
    if json_mode {
        let payload = serde_json::json!({
            "error": err.to_string(),
            "issue": err.issue_key(),
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
        );
    } else {
        eprintln!("error: {err}");
    }
    std::process::exit(err.exit_code());
}
