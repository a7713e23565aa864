//! Source catalog for the swap router.
//!
//! The catalog is the process-wide, read-only list of liquidity sources and
//! what each of them can do. Every routing request resolves its allowed
//! source set against it before any sampling happens.

use router_types::{RouterError, Side, Source, SourceFlags};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
	#[error("Included and excluded sources are mutually exclusive")]
	AmbiguousFilters,
	#[error("Source {liquidity_source} does not support {side} operations")]
	UnsupportedSide {
		liquidity_source: Source,
		side: Side,
	},
	#[error("Source {0} is not in the catalog")]
	UnknownSource(Source),
}

impl From<CatalogError> for RouterError {
	fn from(err: CatalogError) -> Self {
		RouterError::Configuration(err.to_string())
	}
}

/// How a source's liquidity reaches the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
	/// Resting orders held by the router; never sampled.
	Orders,
	/// Sampled together with other sources in one batched call.
	Batched,
	/// Pools are discovered off-chain and sampled one call per source.
	PoolDiscovery,
	/// Synthesized from two chained sources.
	TwoHop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCapabilities {
	pub sell: bool,
	pub buy: bool,
	pub sampling: SamplingMode,
	/// Whether the source can be one leg of a two-hop route.
	pub chainable: bool,
}

impl SourceCapabilities {
	const fn batched(chainable: bool) -> Self {
		Self {
			sell: true,
			buy: true,
			sampling: SamplingMode::Batched,
			chainable,
		}
	}

	const fn discovered() -> Self {
		Self {
			sell: true,
			buy: true,
			sampling: SamplingMode::PoolDiscovery,
			chainable: false,
		}
	}

	pub fn supports(&self, side: Side) -> bool {
		match side {
			Side::Sell => self.sell,
			Side::Buy => self.buy,
		}
	}
}

/// The known sources and their capabilities.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
	entries: Vec<(Source, SourceCapabilities)>,
}

impl Default for SourceCatalog {
	fn default() -> Self {
		Self::standard()
	}
}

impl SourceCatalog {
	/// The mainnet source set.
	pub fn standard() -> Self {
		let entries = Source::ALL
			.iter()
			.map(|source| {
				let caps = match source {
					Source::Native => SourceCapabilities {
						sell: true,
						buy: true,
						sampling: SamplingMode::Orders,
						chainable: false,
					},
					Source::MultiHop => SourceCapabilities {
						sell: true,
						buy: true,
						sampling: SamplingMode::TwoHop,
						chainable: false,
					},
					// Bancor pool paths are only quotable on the sell side.
					Source::Bancor => SourceCapabilities {
						buy: false,
						..SourceCapabilities::discovered()
					},
					Source::Balancer | Source::Cream => SourceCapabilities::discovered(),
					Source::Uniswap
					| Source::UniswapV2
					| Source::Eth2Dai
					| Source::Kyber
					| Source::Mooniswap
					| Source::SushiSwap => SourceCapabilities::batched(true),
					Source::Curve
					| Source::MStable
					| Source::Swerve
					| Source::SnowSwap
					| Source::Shell
					| Source::Dodo
					| Source::LiquidityProvider => SourceCapabilities::batched(false),
				};
				(*source, caps)
			})
			.collect();
		Self { entries }
	}

	pub fn capabilities(&self, source: Source) -> Option<SourceCapabilities> {
		self.entries
			.iter()
			.find(|(s, _)| *s == source)
			.map(|(_, caps)| *caps)
	}

	pub fn supports(&self, source: Source, side: Side) -> bool {
		self.capabilities(source)
			.is_some_and(|caps| caps.supports(side))
	}

	/// All sources supporting `side`.
	pub fn sources_for(&self, side: Side) -> SourceFlags {
		self.entries
			.iter()
			.filter(|(_, caps)| caps.supports(side))
			.map(|(s, _)| *s)
			.collect()
	}

	/// Sources in `flags` sampled the given way.
	pub fn with_sampling(&self, flags: SourceFlags, mode: SamplingMode) -> Vec<Source> {
		flags
			.sources()
			.into_iter()
			.filter(|s| self.capabilities(*s).is_some_and(|c| c.sampling == mode))
			.collect()
	}

	/// Sources in `flags` that can be a leg of a two-hop route.
	pub fn chainable(&self, flags: SourceFlags) -> Vec<Source> {
		flags
			.sources()
			.into_iter()
			.filter(|s| self.capabilities(*s).is_some_and(|c| c.chainable))
			.collect()
	}

	/// Computes the sources a request may draw from.
	///
	/// With an include list the result is exactly those sources, each of
	/// which must support `side`. Otherwise it is every source supporting
	/// `side` minus the exclude list. Two-hop routing survives only when at
	/// least two chainable sources remain.
	pub fn resolve_allowed_sources(
		&self,
		side: Side,
		included: &[Source],
		excluded: &[Source],
	) -> Result<SourceFlags, CatalogError> {
		if !included.is_empty() && !excluded.is_empty() {
			return Err(CatalogError::AmbiguousFilters);
		}

		let mut allowed = if included.is_empty() {
			let excluded: SourceFlags = excluded.iter().copied().collect();
			SourceFlags(self.sources_for(side).0 & !excluded.0)
		} else {
			for source in included {
				let caps = self
					.capabilities(*source)
					.ok_or(CatalogError::UnknownSource(*source))?;
				if !caps.supports(side) {
					return Err(CatalogError::UnsupportedSide {
						liquidity_source: *source,
						side,
					});
				}
			}
			included.iter().copied().collect()
		};

		if allowed.contains(Source::MultiHop) && self.chainable(allowed).len() < 2 {
			debug!("Dropping MultiHop: fewer than two chainable sources enabled");
			allowed = SourceFlags(allowed.0 & !Source::MultiHop.flag().0);
		}

		Ok(allowed)
	}
}
