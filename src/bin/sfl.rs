//! sfl CLI - Password-based file encryption
//!
//! Command-line interface for encrypting and decrypting files into `.sfl`
//! packages using PBKDF2-HMAC-SHA256 key derivation and AES-256-GCM.

use clap::{ArgAction, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process;

use secure_file_locker::file_ops;
use secure_file_locker::passphrase::{
    CachingPassphraseReader, PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader,
};
use secure_file_locker::random::OsRandom;
use secure_file_locker::strength::{self, DEFAULT_GENERATED_LENGTH};
use secure_file_locker::{DEFAULT_ITERATIONS, Locker, LockerConfig, Result};

#[derive(Parser)]
#[command(name = "sfl")]
#[command(version)]
#[command(about = "Password-based file encryption.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// PBKDF2 iterations for newly written packages
    #[arg(long, global = true, env = "SFL_ITERATIONS", default_value_t = DEFAULT_ITERATIONS,
          value_parser = clap::value_parser!(u32).range(1..))]
    iterations: u32,

    /// Increase log verbosity (-v info, -vv debug). SFL_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the package to (default: <input>.sfl)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decrypt a .sfl file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the .sfl package to be decrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the decrypted contents to (default: the original
        /// file name, next to the package)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Update an encrypted file with new content, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing .sfl package to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Show the metadata header of a .sfl file
    #[command(alias = "i")]
    Inspect {
        /// Path to the .sfl package
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Score a password and suggest improvements
    Strength,

    /// Print a randomly generated strong password
    Generate {
        /// Number of characters
        #[arg(short, long, default_value_t = DEFAULT_GENERATED_LENGTH as u16,
              value_parser = clap::value_parser!(u16).range(1..))]
        length: u16,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let locker = Locker::with_config(LockerConfig {
        iterations: cli.iterations,
    });

    let result = run(&cli, &locker);

    if let Err(e) = result {
        tracing::debug!(kind = ?e.kind, category = ?e.category, "command failed");
        eprintln!("Error: {}", describe(&e));
        process::exit(1);
    }
}

fn run(cli: &Cli, locker: &Locker) -> Result<()> {
    match &cli.command {
        Commands::Encrypt { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            let written = file_ops::encrypt_file(locker, input, output.as_deref(), &mut *reader)?;
            println!("{}", written.display());
        }
        Commands::Decrypt { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            let written = file_ops::decrypt_file(locker, input, output.as_deref(), &mut *reader)?;
            println!("{}", written.display());
        }
        Commands::Update { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::update_file(locker, input, output, &mut *reader)?;
        }
        Commands::Inspect { input } => {
            let metadata = file_ops::inspect_file(input)?;
            println!("name:       {}", metadata.original_name);
            println!("size:       {} bytes", metadata.size);
            println!("created:    {}", metadata.created_at);
            println!("version:    {}", metadata.version);
            println!("algorithm:  {}", metadata.algorithm.as_str());
            println!("kdf:        PBKDF2-HMAC-SHA256, {} iterations", metadata.iterations);
        }
        Commands::Strength => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            let password = reader.read_passphrase()?;
            let report = strength::score(&password);
            println!("score: {}/{} ({})", report.score, strength::MAX_SCORE, report.label());
            for hint in &report.feedback {
                println!("- {}", hint);
            }
        }
        Commands::Generate { length } => {
            let password = strength::generate_strong_password(&OsRandom, usize::from(*length))?;
            println!("{}", password);
        }
    }
    Ok(())
}

/// The error message followed by its chain of causes.
fn describe(err: &secure_file_locker::LockerError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env("SFL_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The password source for a command, asked at most once per run.
fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    let upstream: Box<dyn PassphraseReader> = if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader::new())
    };
    Box::new(CachingPassphraseReader::new(upstream))
}
