//! Liquidity source identifiers and source-combination bitmasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A liquidity venue the router can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
	/// Resting orders held directly by the router, including accepted quotes.
	Native,
	Uniswap,
	UniswapV2,
	Eth2Dai,
	Kyber,
	Curve,
	Balancer,
	Bancor,
	MStable,
	Mooniswap,
	Swerve,
	SnowSwap,
	SushiSwap,
	/// Two chained sources through an intermediate token.
	MultiHop,
	Shell,
	Cream,
	Dodo,
	LiquidityProvider,
}

impl Source {
	/// Every known source, in bit order.
	pub const ALL: [Source; 18] = [
		Source::Native,
		Source::Uniswap,
		Source::UniswapV2,
		Source::Eth2Dai,
		Source::Kyber,
		Source::Curve,
		Source::Balancer,
		Source::Bancor,
		Source::MStable,
		Source::Mooniswap,
		Source::Swerve,
		Source::SnowSwap,
		Source::SushiSwap,
		Source::MultiHop,
		Source::Shell,
		Source::Cream,
		Source::Dodo,
		Source::LiquidityProvider,
	];

	/// The single-bit mask of this source.
	pub fn flag(self) -> SourceFlags {
		SourceFlags(1 << self.bit())
	}

	fn bit(self) -> u32 {
		Source::ALL
			.iter()
			.position(|s| *s == self)
			.map(|i| i as u32)
			.unwrap_or_default()
	}

	pub fn name(&self) -> &'static str {
		match self {
			Source::Native => "Native",
			Source::Uniswap => "Uniswap",
			Source::UniswapV2 => "Uniswap_V2",
			Source::Eth2Dai => "Eth2Dai",
			Source::Kyber => "Kyber",
			Source::Curve => "Curve",
			Source::Balancer => "Balancer",
			Source::Bancor => "Bancor",
			Source::MStable => "mStable",
			Source::Mooniswap => "Mooniswap",
			Source::Swerve => "Swerve",
			Source::SnowSwap => "SnowSwap",
			Source::SushiSwap => "SushiSwap",
			Source::MultiHop => "MultiHop",
			Source::Shell => "Shell",
			Source::Cream => "CREAM",
			Source::Dodo => "DODO",
			Source::LiquidityProvider => "LiquidityProvider",
		}
	}
}

impl fmt::Display for Source {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl std::str::FromStr for Source {
	type Err = String;

	/// Parses either the display name or the variant name, ignoring case.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let wanted = s.replace('_', "").to_ascii_lowercase();
		Source::ALL
			.iter()
			.copied()
			.find(|source| {
				source.name().replace('_', "").to_ascii_lowercase() == wanted
					|| format!("{:?}", source).to_ascii_lowercase() == wanted
			})
			.ok_or_else(|| format!("Unknown source: {}", s))
	}
}

/// Bitmask of the sources touched by a path.
///
/// Settlement overhead is a function of this mask rather than a sum over
/// sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFlags(pub u32);

impl SourceFlags {
	pub fn empty() -> Self {
		Self(0)
	}

	pub fn is_empty(&self) -> bool {
		self.0 == 0
	}

	pub fn contains(&self, source: Source) -> bool {
		self.0 & source.flag().0 != 0
	}

	pub fn insert(&mut self, source: Source) {
		self.0 |= source.flag().0;
	}

	/// Number of distinct sources in the mask.
	pub fn count(&self) -> u32 {
		self.0.count_ones()
	}

	pub fn sources(&self) -> Vec<Source> {
		Source::ALL
			.iter()
			.copied()
			.filter(|s| self.contains(*s))
			.collect()
	}

	pub fn is_disjoint(&self, other: SourceFlags) -> bool {
		self.0 & other.0 == 0
	}
}

impl BitOr for SourceFlags {
	type Output = SourceFlags;

	fn bitor(self, rhs: Self) -> Self::Output {
		SourceFlags(self.0 | rhs.0)
	}
}

impl BitOrAssign for SourceFlags {
	fn bitor_assign(&mut self, rhs: Self) {
		self.0 |= rhs.0;
	}
}

impl FromIterator<Source> for SourceFlags {
	fn from_iter<I: IntoIterator<Item = Source>>(iter: I) -> Self {
		let mut flags = SourceFlags::empty();
		for source in iter {
			flags.insert(source);
		}
		flags
	}
}
