//! proxy-ns command-line entry point
//!
//! Joins a provider-managed network namespace, gives the process a private
//! `/etc/resolv.conf`, and execs the requested command.
//!
//! Deliberately synchronous: `setns(2)` and `unshare(2)` act on the calling
//! thread, and `unshare(CLONE_NEWNS)` is refused once other threads share
//! the filesystem context.

use std::process;

use clap::CommandFactory;
use tracing_subscriber::EnvFilter;

mod cli;
mod run;

use cli::Cli;

/// Environment variable holding the log filter
const LOG_ENV: &str = "PROXY_NS_LOG";

fn main() {
    // Parse command-line arguments
    let cli = match Cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are successes; anything else is a usage error.
            let code = i32::from(e.use_stderr());
            let _ = e.print();
            process::exit(code);
        }
    };

    if cli.command.is_empty() {
        let _ = Cli::command().print_help();
        process::exit(0);
    }

    init_logging(cli.verbose);

    // Only returns on failure
    let Err(e) = run::execute(&cli);
    eprintln!("proxy-ns: {e:#}");
    process::exit(1);
}

/// Log to stderr, silent unless `-v` or `PROXY_NS_LOG` asks otherwise
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
