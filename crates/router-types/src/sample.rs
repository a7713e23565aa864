//! Price curve samples returned by the sampler.

use crate::{Address, Amount, Bytes, NativeOrder, Source};
use serde::{Deserialize, Serialize};

/// Source-specific data needed to materialize a fill into an order.
///
/// The router never looks inside bridge calldata; it only carries it from the
/// sampler to the materializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FillData {
	/// No extra data.
	Empty,
	/// A resting order.
	Native { order: Box<NativeOrder> },
	/// Opaque bridge calldata, optionally tied to a specific pool.
	Bridge {
		pool: Option<Address>,
		data: Bytes,
	},
	/// Both legs of a two-hop route.
	MultiHop(Box<MultiHopFillData>),
}

impl Default for FillData {
	fn default() -> Self {
		FillData::Empty
	}
}

impl FillData {
	/// The resting order, if this is native fill data.
	pub fn native_order(&self) -> Option<&NativeOrder> {
		match self {
			FillData::Native { order } => Some(order),
			_ => None,
		}
	}

	pub fn pool(&self) -> Option<Address> {
		match self {
			FillData::Bridge { pool, .. } => *pool,
			_ => None,
		}
	}
}

/// Fill data for a route through an intermediate token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiHopFillData {
	pub first_hop_source: Source,
	pub second_hop_source: Source,
	pub intermediate_token: Address,
	pub first_hop_data: FillData,
	pub second_hop_data: FillData,
}

/// One point on a source's price curve: selling `input` yields a cumulative
/// `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
	pub source: Source,
	pub input: Amount,
	pub output: Amount,
	#[serde(default)]
	pub fill_data: FillData,
}

impl Sample {
	pub fn new(source: Source, input: Amount, output: Amount) -> Self {
		Self {
			source,
			input,
			output,
			fill_data: FillData::Empty,
		}
	}

	pub fn with_fill_data(mut self, fill_data: FillData) -> Self {
		self.fill_data = fill_data;
		self
	}
}

/// Checks that a sample series is usable by the optimizer.
///
/// Amounts must be non-negative and both input and output must be
/// non-decreasing. The marginal rate is free to rise, so concave curves are
/// accepted.
pub fn validate_samples(samples: &[Sample]) -> Result<(), String> {
	let mut previous: Option<&Sample> = None;
	for (i, sample) in samples.iter().enumerate() {
		if sample.input.is_sign_negative() || sample.output.is_sign_negative() {
			return Err(format!("sample {} has a negative amount", i));
		}
		if let Some(prev) = previous {
			if sample.input < prev.input {
				return Err(format!("sample {} input decreases", i));
			}
			if sample.output < prev.output {
				return Err(format!("sample {} output decreases", i));
			}
		}
		previous = Some(sample);
	}
	Ok(())
}
