#![forbid(unsafe_code)]
//! Offline inspection of a govchain store: verify the chain, list blocks and proposals

use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::path::PathBuf;
use govchain::blockchain::verify_chain;
use govchain::cli::{format_timestamp, open_existing_database, short_hash};
use govchain::config::{load_config_from, DEFAULT_CONFIG_PATH};
use govchain::error::ChainError;
use govchain::governance::ProposalStatus;

#[derive(Parser)]
#[command(name = "govchain-inspect", about = "Inspect a govchain ledger store")]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recompute every digest and check every link
    Verify,
    /// Show the most recent blocks
    Blocks {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show all proposals and their decisions
    Proposals,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;
    let db = open_existing_database(&config)?;

    match cli.command {
        Command::Verify => {
            let blocks = db.load_blocks()?;
            match verify_chain(&blocks) {
                Ok(()) => {
                    println!(
                        "{}",
                        format!("✅ Chain valid ({} blocks)", blocks.len()).green().bold()
                    );
                }
                Err(ChainError::ChainIntegrity { index, fault }) => {
                    eprintln!(
                        "{}",
                        format!("❌ Chain broken at block {}: {}", index, fault).red().bold()
                    );
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Blocks { limit } => {
            let blocks = db.load_blocks()?;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    Cell::new("Index").add_attribute(Attribute::Bold),
                    Cell::new("Timestamp").add_attribute(Attribute::Bold),
                    Cell::new("Miner").add_attribute(Attribute::Bold),
                    Cell::new("Reward").add_attribute(Attribute::Bold),
                    Cell::new("Hash").add_attribute(Attribute::Bold),
                    Cell::new("Prev").add_attribute(Attribute::Bold),
                    Cell::new("Data").add_attribute(Attribute::Bold),
                ]);

            for block in blocks.iter().rev().take(limit) {
                table.add_row(vec![
                    Cell::new(block.index).fg(TableColor::Cyan),
                    Cell::new(format_timestamp(block.timestamp)),
                    Cell::new(&block.miner_id),
                    Cell::new(format!("{:.2}", block.reward)).fg(TableColor::Yellow),
                    Cell::new(short_hash(&block.hash_hex())),
                    Cell::new(short_hash(&block.prev_hash_hex())),
                    Cell::new(&block.data),
                ]);
            }

            println!("{}", "📦 Blocks".bright_cyan().bold());
            println!("{table}");
            println!("{}", format!("Total: {}", blocks.len()).dimmed());
        }
        Command::Proposals => {
            let proposals = db.load_proposals()?;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    Cell::new("ID").add_attribute(Attribute::Bold),
                    Cell::new("Created").add_attribute(Attribute::Bold),
                    Cell::new("Status").add_attribute(Attribute::Bold),
                    Cell::new("Voter").add_attribute(Attribute::Bold),
                    Cell::new("Proposal").add_attribute(Attribute::Bold),
                ]);

            for proposal in &proposals {
                let status = match proposal.status() {
                    ProposalStatus::Undecided => Cell::new("open").fg(TableColor::Yellow),
                    ProposalStatus::Decided if proposal.approved => {
                        Cell::new("approved").fg(TableColor::Green)
                    }
                    ProposalStatus::Decided => Cell::new("rejected").fg(TableColor::Red),
                };
                table.add_row(vec![
                    Cell::new(proposal.id.as_str()),
                    Cell::new(format_timestamp(proposal.timestamp)),
                    status,
                    Cell::new(&proposal.voter),
                    Cell::new(&proposal.text),
                ]);
            }

            println!("{}", "🗳  Proposals".bright_magenta().bold());
            println!("{table}");
        }
    }

    Ok(())
}
