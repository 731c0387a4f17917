pub mod state;

use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre;

use sift_service::{BatchQueryRequest, BatchSearchRequest, RetrieveRequest};

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Run one hybrid retrieval and print the reranked passages.
	Retrieve {
		query: String,
		/// Candidates requested from each search branch.
		#[arg(long)]
		top_k: Option<u32>,
		#[arg(long)]
		max_results: Option<u32>,
	},
	/// Search many queries against the vector index in one round trip.
	Batch {
		/// One query per line, or a JSON array of vectors with `--vectors`.
		#[arg(value_name = "FILE")]
		file: PathBuf,
		#[arg(long)]
		vectors: bool,
		#[arg(long)]
		top_k_per_query: Option<u32>,
		#[arg(long)]
		candidate_limit: Option<u32>,
		#[arg(long)]
		probe: Option<u32>,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;

	sift_cli::init_tracing(&config.service.log_level);

	let state = AppState::new(config).await?;
	let output = match args.command {
		Command::Retrieve { query, top_k, max_results } => {
			let result =
				state.service.retrieve_request(RetrieveRequest { query, top_k, max_results }).await?;

			serde_json::to_string_pretty(&result)?
		},
		Command::Batch { file, vectors, top_k_per_query, candidate_limit, probe } => {
			let raw = fs::read_to_string(&file)?;
			let response = if vectors {
				state
					.service
					.search_batch(BatchSearchRequest {
						vectors: serde_json::from_str(&raw)?,
						top_k_per_query,
						candidate_limit_per_query: candidate_limit,
						probe,
					})
					.await?
			} else {
				let queries = read_queries(&raw);

				if queries.is_empty() {
					return Err(eyre::eyre!("{} contains no queries.", file.display()));
				}

				state
					.service
					.search_batch_queries(BatchQueryRequest {
						queries,
						top_k_per_query,
						candidate_limit_per_query: candidate_limit,
						probe,
					})
					.await?
			};

			serde_json::to_string_pretty(&response)?
		},
	};

	println!("{output}");

	Ok(())
}

/// Non-blank lines, trimmed, in file order.
pub fn read_queries(raw: &str) -> Vec<String> {
	raw.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_string).collect()
}
