//! dmscrypt CLI - passphrase-based text and file encryption
//!
//! Command-line front end for AES-256-CBC containers with PBKDF2-SHA256
//! key derivation.

use clap::{ArgAction, Parser, Subcommand};
use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use dmscrypt::codec::Format;
use dmscrypt::file_ops;
use dmscrypt::passphrase::{
    DEFAULT_PASSPHRASE_ENV, EnvPassphraseReader, PassphraseReader, ReaderPassphraseReader,
    TerminalPassphraseReader,
};
use dmscrypt::stats::OperationStats;

#[derive(Parser)]
#[command(name = "dmscrypt")]
#[command(version)]
#[command(about = "Passphrase-based text and file encryption.", long_about = None)]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long, global = true, conflicts_with = "passphrase_env")]
    passphrase_stdin: bool,

    /// Read passphrase from an environment variable (--passphrase-env=VAR to name one)
    #[arg(
        long,
        global = true,
        value_name = "VAR",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = DEFAULT_PASSPHRASE_ENV
    )]
    passphrase_env: Option<String>,

    /// Print sizes and elapsed time to stderr
    #[arg(long, global = true)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a UTF-8 text file as a text container
    #[command(alias = "e")]
    Encrypt {
        /// Path to the text whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the armored container to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Emit an untagged container readable by older front ends
        #[arg(long)]
        legacy: bool,
    },

    /// Encrypt any file, recording its name, content type and size
    #[command(alias = "ef")]
    EncryptFile {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the armored container to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Content type to record (guessed from the extension if omitted)
        #[arg(long, value_name = "MIME")]
        content_type: Option<String>,

        /// Emit an untagged container readable by older front ends
        #[arg(long)]
        legacy: bool,
    },

    /// Decrypt a container of any format
    #[command(alias = "d")]
    Decrypt {
        /// Path to the armored container
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output file, or a directory to restore a file under its recorded name
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut reader = get_passphrase_reader(cli.passphrase_stdin, cli.passphrase_env.as_deref());

    let result = match cli.command {
        Commands::Encrypt {
            input,
            output,
            legacy,
        } => file_ops::encrypt_text_file(&input, &output, &mut *reader, container_format(legacy)),
        Commands::EncryptFile {
            input,
            output,
            content_type,
            legacy,
        } => file_ops::encrypt_file(
            &input,
            &output,
            &mut *reader,
            container_format(legacy),
            content_type.as_deref(),
        ),
        Commands::Decrypt { input, output } => {
            file_ops::decrypt_file(&input, &output, &mut *reader).map(|outcome| {
                if let Some(metadata) = &outcome.metadata {
                    eprintln!(
                        "Decrypted file: {} ({}, {})",
                        outcome.written.display(),
                        metadata.content_type,
                        dmscrypt::stats::format_bytes(metadata.size)
                    );
                }
                outcome.stats
            })
        }
    };

    match result {
        Ok(stats) => report_stats(cli.stats, &stats),
        Err(e) => {
            eprintln!("Error: {}", error_chain(&e));
            process::exit(1);
        }
    }
}

fn container_format(legacy: bool) -> Format {
    if legacy { Format::Legacy } else { Format::Tagged }
}

fn report_stats(enabled: bool, stats: &OperationStats) {
    if enabled {
        eprintln!("{}", stats);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dmscrypt={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

fn get_passphrase_reader(use_stdin: bool, env_var: Option<&str>) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else if let Some(var) = env_var {
        Box::new(EnvPassphraseReader::new(var))
    } else {
        Box::new(TerminalPassphraseReader)
    }
}
