mod config;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gbc_mmu::StateWriter;
use log::{error, info};

use config::{ConsoleSelect, ProbeConfig};
use session::{ProbeError, SnapshotSummary};

fn parse_addr(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('$'))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid address {s:?}: {e}"))
}

#[derive(Parser)]
#[command(about = "Inspect Game Boy memory maps and snapshots")]
struct Args {
    /// Path to probe config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force DMG mode
    #[arg(long, conflicts_with = "cgb")]
    dmg: bool,

    /// Force CGB mode
    #[arg(long, conflicts_with = "dmg")]
    cgb: bool,

    /// Path to boot ROM file, overriding the config
    #[arg(long)]
    bootrom: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hex dump a range of the address space
    Dump {
        rom: PathBuf,
        /// First address (hex)
        #[arg(long, value_parser = parse_addr, default_value = "0000")]
        start: u16,
        /// Number of bytes
        #[arg(long, default_value_t = 0x100)]
        len: usize,
        /// Bytes per line, overriding the config
        #[arg(long)]
        width: Option<usize>,
        /// Snapshot to restore before dumping
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Print single bytes
    Peek {
        rom: PathBuf,
        #[arg(required = true, value_parser = parse_addr)]
        addrs: Vec<u16>,
        /// Snapshot to restore before reading
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Write a power-on snapshot for a ROM
    Save {
        rom: PathBuf,
        out: PathBuf,
        /// Append the extended block
        #[arg(long)]
        extended: bool,
    },
    /// Summarise a snapshot file
    Inspect { snapshot: PathBuf },
}

impl Args {
    fn console(&self, cfg: &ProbeConfig) -> ConsoleSelect {
        if self.dmg {
            ConsoleSelect::Dmg
        } else if self.cgb {
            ConsoleSelect::Cgb
        } else {
            cfg.console
        }
    }
}

fn run(args: Args) -> Result<(), ProbeError> {
    let cfg_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let cfg = config::load_from_file(&cfg_path);
    let console = args.console(&cfg);
    let bootrom = args.bootrom.as_deref();

    match &args.command {
        Command::Dump {
            rom,
            start,
            len,
            width,
            state,
        } => {
            let image = session::read_file(rom)?;
            let mut mmu = session::open(&image, console, bootrom, &cfg)?;
            if let Some(path) = state {
                session::restore(&mut mmu, &session::read_file(path)?)?;
            }
            let width = width.unwrap_or(cfg.dump_width);
            print!("{}", session::format_dump(&mmu, *start, *len, width));
        }
        Command::Peek { rom, addrs, state } => {
            let image = session::read_file(rom)?;
            let mut mmu = session::open(&image, console, bootrom, &cfg)?;
            if let Some(path) = state {
                session::restore(&mut mmu, &session::read_file(path)?)?;
            }
            for &addr in addrs {
                println!("{addr:04X}: {:02X}", mmu.peek_byte(addr));
            }
        }
        Command::Save { rom, out, extended } => {
            let image = session::read_file(rom)?;
            let mut mmu = session::open(&image, console, bootrom, &cfg)?;
            let mut writer = StateWriter::new();
            let len = if *extended {
                mmu.save_extended_state(&mut writer)
            } else {
                mmu.save_state(&mut writer)
            };
            session::write_file(out, writer.as_bytes())?;
            info!("wrote {len} bytes to {}", out.display());
        }
        Command::Inspect { snapshot } => {
            let bytes = session::read_file(snapshot)?;
            println!("{}", SnapshotSummary::parse(&bytes)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
