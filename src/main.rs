use clap::Parser;
use mapmul::cli::{error_message, execute_command, exit_code, get_log_level, Cli};
use tracing::{debug, error, trace};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = get_log_level(cli.verbose, &cli.command).await;

    // Logs go to stderr so result lines on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(log_level.as_str())
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("mapmul started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = execute_command(cli.command).await {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", error_message(&e));
        std::process::exit(exit_code(&e));
    }
}
