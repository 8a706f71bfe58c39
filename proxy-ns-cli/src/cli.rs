//! CLI argument definitions

use std::ffi::OsString;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "proxy-ns")]
#[command(about = "Run a command inside a proxy-ns network namespace", long_about = None)]
#[command(override_usage = "proxy-ns [--help]\n       proxy-ns [-n|--net <name>] <command> [<arg> ...]")]
#[command(after_help = "More help in README file")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Network namespace to join (default from configuration, usually "main")
    #[arg(short = 'n', long = "net", value_name = "NAME")]
    pub net: Option<String>,

    /// Command to run, with its arguments
    #[arg(
        value_name = "COMMAND",
        num_args = 1..,
        trailing_var_arg = true,
        value_parser = clap::value_parser!(OsString)
    )]
    pub command: Vec<OsString>,
}

impl Cli {
    /// Parse `args`, leaving everything after the `-n NAME` pair to the command
    ///
    /// # Errors
    /// Returns clap's error for help, version, and malformed options
    pub fn parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(split_command(args.into_iter().map(Into::into)))
    }
}

/// Rewrite argv so that clap only sees our leading options
///
/// Options are read up to and including the namespace selection. The rest,
/// starting at the first non-option, is passed after `--` so that flags such
/// as `--help` reach the command untouched.
fn split_command(mut args: impl Iterator<Item = OsString>) -> Vec<OsString> {
    let mut out: Vec<OsString> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        let Some(text) = arg.to_str() else {
            out.push("--".into());
            out.push(arg);
            break;
        };

        if text == "--" {
            out.push(arg);
            break;
        }

        if text == "-n" || text == "--net" {
            // Bind the value with `=` so a leading hyphen stays a name.
            match args.next() {
                Some(name) => {
                    let mut pair = OsString::from("--net=");
                    pair.push(name);
                    out.push(pair);
                    out.push("--".into());
                }
                None => out.push(arg),
            }
            break;
        }

        if text.starts_with("--net=") || text.starts_with("-n") {
            out.push(arg);
            out.push("--".into());
            break;
        }

        if !text.starts_with('-') || text == "-" {
            out.push("--".into());
            out.push(arg);
            break;
        }

        out.push(arg);
    }

    out.extend(args);
    out
}
