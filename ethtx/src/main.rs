/*
Command-line front end: decode a raw signed Ethereum transaction and print
its fields together with the recovered sender.

Usage:
  ethtx [--json] [-v...] <RAW_TX_HEX>
  echo <RAW_TX_HEX> | ethtx [--json]

Piped input may carry one transaction per line; those are decoded in parallel.
*/

use std::fmt;
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use ethtx::render::{render_json, render_text};
use ethtx::{decode_and_resolve, decode_batch, DecodedTransaction, MAX_TX_SIZE};

#[derive(Parser, Debug)]
#[command(name = "ethtx", version, about = "Decode a raw Ethereum transaction and recover its sender")]
struct Args {
    /// Raw signed transaction as hex, with or without a 0x prefix
    #[arg(value_name = "RAW_TX_HEX")]
    tx_hex: Option<String>,

    /// Print a JSON document instead of the text summary
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Ambiguous or missing input.
#[derive(Debug)]
enum UsageError {
    BothInputs,
    NoInput,
    Empty,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::BothInputs => {
                write!(f, "pass the transaction as an argument or on stdin, not both")
            }
            UsageError::NoInput => {
                write!(f, "no transaction given; pass it as an argument or pipe it on stdin")
            }
            UsageError::Empty => write!(f, "input is empty"),
        }
    }
}

impl std::error::Error for UsageError {}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when some inputs of a batch failed.
fn run(args: &Args) -> Result<bool> {
    let piped = stdin_is_piped();

    let lines = match (&args.tx_hex, piped) {
        (Some(_), true) => return Err(UsageError::BothInputs.into()),
        (None, false) => return Err(UsageError::NoInput.into()),
        (Some(arg), false) => vec![arg.trim().to_string()],
        (None, true) => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            input
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()
        }
    };

    match lines.as_slice() {
        [] => Err(UsageError::Empty.into()),
        [single] => {
            let raw = decode_hex(single)?;
            let decoded = decode_and_resolve(&raw).context("failed to decode transaction")?;
            print_decoded(&decoded, args.json)?;
            Ok(true)
        }
        many => run_batch(many, args.json),
    }
}

fn run_batch(lines: &[String], json: bool) -> Result<bool> {
    log::info!("decoding {} transactions", lines.len());

    let mut all_ok = true;
    let mut printed = 0;
    for (i, result) in decode_lines(lines).into_iter().enumerate() {
        match result {
            Ok(decoded) => {
                if printed > 0 && !json {
                    println!();
                }
                print_decoded(&decoded, json)?;
                printed += 1;
            }
            Err(e) => {
                eprintln!("error: line {}: {:#}", i + 1, e);
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

/// Decodes every line, one result per line in input order.
///
/// Lines that are not valid hex fail on their own; the rest go through
/// [`decode_batch`].
fn decode_lines(lines: &[String]) -> Vec<Result<DecodedTransaction>> {
    let parsed: Vec<Result<Vec<u8>>> = lines.iter().map(|line| decode_hex(line)).collect();

    let raws: Vec<&[u8]> = parsed
        .iter()
        .filter_map(|raw| raw.as_ref().ok())
        .map(Vec::as_slice)
        .collect();
    let mut decoded = decode_batch(&raws).into_iter();

    parsed
        .into_iter()
        .map(|raw| {
            if let Err(e) = raw {
                return Err(e);
            }
            match decoded.next() {
                Some(result) => Ok(result?),
                None => Err(anyhow::anyhow!("missing batch result")),
            }
        })
        .collect()
}

fn print_decoded(decoded: &DecodedTransaction, json: bool) -> Result<()> {
    if json {
        println!("{}", render_json(decoded).context("failed to serialize summary")?);
    } else {
        println!("{}", render_text(decoded));
    }
    Ok(())
}

fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let stripped = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);

    if stripped.is_empty() {
        return Err(UsageError::Empty.into());
    }
    // Two hex digits per byte
    if stripped.len() > MAX_TX_SIZE * 2 {
        anyhow::bail!("input exceeds {} bytes", MAX_TX_SIZE);
    }

    hex::decode(stripped).context("input is not valid hex")
}

/// True when stdin is a pipe or redirected file rather than a terminal.
fn stdin_is_piped() -> bool {
    if io::stdin().is_terminal() {
        return false;
    }

    // Character devices such as /dev/null count as no input
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if let Ok(meta) = std::fs::metadata("/dev/stdin") {
            let file_type = meta.file_type();
            return file_type.is_fifo() || file_type.is_socket() || file_type.is_file();
        }
    }

    true
}
