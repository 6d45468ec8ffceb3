//! Histrim CLI binary: compact, truncate or inspect a JSONL session log.
//!
//! Subcommands: `compact` (ratio target), `optimize` (absolute budget), `truncate` (keep last N),
//! `stats`, `score`.

mod logging;

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cli::{
    load_history, read_items, resolve_config, run_action, score_rows, write_messages, Action,
    CliError, ConfigOverrides, JsonlArchive,
};

#[derive(Parser, Debug)]
#[command(name = "histrim")]
#[command(about = "Histrim: keep a conversation history within a token budget")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Session log to read (JSONL of {role, content, timestamp}); default: stdin
    #[arg(short, long, global = true, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Where to write the result; default: stdout
    #[arg(short, long, global = true, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Append evicted messages to this JSONL archive
    #[arg(long, global = true, value_name = "PATH", env = "HISTRIM_ARCHIVE")]
    archive: Option<PathBuf>,

    /// Fraction of tokens to remove on `compact`, in [0, 1)
    #[arg(long, global = true, value_name = "RATIO")]
    ratio: Option<f64>,

    /// Most recent messages that always survive
    #[arg(long, global = true, value_name = "N")]
    minimum_messages: Option<usize>,

    /// after_pruning, before_pruning or disabled
    #[arg(long, global = true, value_name = "ORDER")]
    compression_order: Option<String>,

    /// max, union or additive
    #[arg(long, global = true, value_name = "POLICY")]
    budget_reservation: Option<String>,

    /// Compact while loading whenever the log exceeds this many tokens
    #[arg(long, global = true, value_name = "N", env = "HISTRIM_TOKEN_LIMIT")]
    token_limit: Option<usize>,

    /// Fail on any invalid record instead of skipping it
    #[arg(long, global = true)]
    strict: bool,

    /// Pretty-print JSON reports
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Compact by `target_reduction_ratio`
    Compact,
    /// Compact to an absolute token budget
    Optimize {
        #[arg(long, value_name = "N")]
        max_tokens: usize,
    },
    /// Keep only the last N messages
    Truncate {
        #[arg(long, value_name = "N")]
        keep: usize,
    },
    /// Print history statistics as JSON
    Stats {
        /// Report utilization against this budget
        #[arg(long, value_name = "N")]
        max_tokens: Option<usize>,
    },
    /// Print each message's score, level, essential flag and kind, one JSON line each
    Score,
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>, CliError> {
    Ok(match path {
        Some(p) => Box::new(std::io::BufWriter::new(File::create(p)?)),
        None => Box::new(std::io::stdout().lock()),
    })
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn run(args: Args, settings: config::Settings) -> Result<(), CliError> {
    let overrides = ConfigOverrides {
        target_reduction_ratio: args.ratio,
        minimum_messages: args.minimum_messages,
        compression_order: args.compression_order.clone(),
        budget_reservation: args.budget_reservation.clone(),
    };
    let compaction = resolve_config(&settings.compaction, &overrides)?;
    tracing::debug!(?compaction, "effective compaction config");

    let items = match &args.input {
        Some(path) => read_items(BufReader::new(File::open(path)?))?,
        None => read_items(std::io::stdin().lock())?,
    };
    let (mut history, rejected) = load_history(items, compaction, args.token_limit, args.strict)?;

    let action = match args.cmd {
        Command::Compact => Action::Compact,
        Command::Optimize { max_tokens } => Action::Optimize { max_tokens },
        Command::Truncate { keep } => Action::Truncate { keep },
        Command::Stats { max_tokens } => {
            let mut out = open_output(args.output.as_ref())?;
            writeln!(out, "{}", to_json(&history.stats(max_tokens), args.pretty)?)?;
            out.flush()?;
            return Ok(());
        }
        Command::Score => {
            let mut out = open_output(args.output.as_ref())?;
            for row in score_rows(&history) {
                writeln!(out, "{}", serde_json::to_string(&row)?)?;
            }
            out.flush()?;
            return Ok(());
        }
    };

    let archive = args.archive.clone().map(JsonlArchive::new);
    let report = run_action(
        &mut history,
        action,
        archive.as_ref().map(|a| a as &dyn histrim::Archive),
    )?;
    if rejected > 0 {
        tracing::warn!(rejected, "invalid records were skipped");
    }
    write_messages(open_output(args.output.as_ref())?, history.snapshot())?;

    let report = to_json(&report, args.pretty)?;
    if args.output.is_some() {
        println!("{}", report);
    } else {
        eprintln!("{}", report);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Env from .env / config.toml must be in place before the subscriber reads RUST_LOG.
    let settings = match config::load_and_apply("histrim", None) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("histrim: {}", e);
            std::process::exit(1);
        }
    };
    logging::init()?;

    let args = Args::parse();
    if let Err(e) = run(args, settings) {
        eprintln!("histrim: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
