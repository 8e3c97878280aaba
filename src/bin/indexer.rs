//! Command-line entry point: replays a line-oriented event dump through
//! [`brc20_swap_indexer::dispatcher::Dispatcher`] and writes the ticker and
//! module dumps described in `DESIGN.md`.
//!
//! ```bash
//! indexer --input events.txt --ticker-dump ticks.txt --module-dump modules.txt
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use brc20_swap_indexer::commit::sig::StubVerifier;
use brc20_swap_indexer::config::Network;
use brc20_swap_indexer::context::IndexerContext;
use brc20_swap_indexer::dispatcher::Dispatcher;
use brc20_swap_indexer::ids::InscriptionId;
use brc20_swap_indexer::io::dump::{write_module_dump, write_ticker_dump};
use brc20_swap_indexer::io::loader::EventReader;
use brc20_swap_indexer::script::HexAddressCodec;

/// Deterministic indexer for a BRC20-style meta-protocol and its swap module.
#[derive(Parser)]
#[command(name = "indexer")]
#[command(version = env!("BUILD_VERSION"))]
struct Cli {
    /// Path to the line-oriented event dump; reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Path to write the per-ticker dump to; skipped when omitted.
    #[arg(long)]
    ticker_dump: Option<PathBuf>,

    /// Path to write the per-module dump to; skipped when omitted.
    #[arg(long)]
    module_dump: Option<PathBuf>,

    /// Host-chain network; only affects address rendering in the dumps.
    #[arg(long, default_value = "mainnet")]
    network: NetworkArg,

    /// Comma-separated ticker allow-list (case-insensitive); empty means
    /// every ticker is accepted.
    #[arg(long, value_delimiter = ',')]
    ticks_enabled: Vec<String>,

    /// Inscription id a module-deploy's `source` field must name.
    #[arg(long)]
    module_swap_source_inscription_id: Option<InscriptionId>,

    /// Override for `ENABLE_SELF_MINT_HEIGHT`.
    #[arg(long)]
    enable_self_mint_height: Option<u32>,

    /// Override for `ENABLE_SWAP_WITHDRAW_HEIGHT`.
    #[arg(long)]
    enable_swap_withdraw_height: Option<u32>,

    /// Disables history bookkeeping for replay-only runs.
    #[arg(long)]
    no_history: bool,

    /// Abort the whole run on the first unparsable input line instead of
    /// skipping it.
    #[arg(long)]
    strict_input: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum NetworkArg {
    Mainnet,
    Testnet,
}

impl From<NetworkArg> for Network {
    fn from(value: NetworkArg) -> Self {
        match value {
            NetworkArg::Mainnet => Network::Mainnet,
            NetworkArg::Testnet => Network::Testnet,
        }
    }
}

fn build_context(cli: &Cli) -> IndexerContext {
    let mut ctx = IndexerContext::default();
    ctx.ticks_enabled = cli
        .ticks_enabled
        .iter()
        .map(|t| t.to_ascii_lowercase())
        .collect::<HashSet<_>>();
    ctx.module_swap_source_inscription_id = cli.module_swap_source_inscription_id.clone();
    if let Some(height) = cli.enable_self_mint_height {
        ctx.enable_self_mint_height = height;
    }
    if let Some(height) = cli.enable_swap_withdraw_height {
        ctx.enable_swap_withdraw_height = height;
    }
    ctx.enable_history = !cli.no_history;
    ctx
}

fn open_input(path: &Option<PathBuf>) -> io::Result<Box<dyn io::BufRead>> {
    match path {
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let network: Network = cli.network.into();
    let ctx = build_context(&cli);
    let codec = HexAddressCodec { network };
    let mut dispatcher = Dispatcher::new(ctx, codec, StubVerifier);

    let reader = open_input(&cli.input)?;
    for result in EventReader::new(reader) {
        match result {
            Ok(event) => dispatcher.process_event(&event),
            Err(e) if cli.strict_input => return Err(e.into()),
            Err(e) => warn!("skipping unparsable input line: {}", e),
        }
    }

    let summary = dispatcher.finish();
    info!(
        "processed={} dropped={} holders_swept={}",
        summary.events_processed, summary.events_dropped, summary.zero_balance_holders_swept
    );

    if let Some(path) = &cli.ticker_dump {
        let mut out = BufWriter::new(File::create(path)?);
        write_ticker_dump(&mut out, dispatcher.tokens(), dispatcher.codec())?;
        out.flush()?;
    }
    if let Some(path) = &cli.module_dump {
        let mut out = BufWriter::new(File::create(path)?);
        write_module_dump(&mut out, dispatcher.modules(), dispatcher.tokens(), dispatcher.codec())?;
        out.flush()?;
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
