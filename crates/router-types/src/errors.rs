//! Error types for the router.

use crate::Source;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// No combination of the available fills reaches the requested amount.
	#[error("No optimal path")]
	NoOptimalPath,

	#[error("Source {liquidity_source} unavailable: {reason}")]
	SourceUnavailable {
		liquidity_source: Source,
		reason: String,
	},

	#[error("Invalid samples from {liquidity_source}: {reason}")]
	InvalidSample {
		liquidity_source: Source,
		reason: String,
	},

	#[error("Materialization error: {0}")]
	Materialization(String),

	#[error("Quote error: {0}")]
	Quote(String),
}

impl RouterError {
	pub fn is_no_optimal_path(&self) -> bool {
		matches!(self, RouterError::NoOptimalPath)
	}
}
