//! Fee, gas and settlement-overhead schedules.
//!
//! Schedules are closures so that callers can price a fill by its source
//! data, not just by its source. Fee and overhead schedules return wei, the
//! gas schedule returns gas units.

use crate::{Amount, FillData, Source, SourceFlags};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a schedule is asked to price.
#[derive(Debug, Clone, Copy)]
pub struct CostQuery<'a> {
	pub source: Source,
	/// Amount of the fill being priced.
	pub input: Amount,
	pub fill_data: &'a FillData,
}

pub type CostFn = Arc<dyn Fn(&CostQuery<'_>) -> Amount + Send + Sync>;

/// Per-source cost functions. Sources without an entry cost nothing.
#[derive(Clone, Default)]
pub struct CostSchedule {
	entries: HashMap<Source, CostFn>,
}

impl fmt::Debug for CostSchedule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut sources: Vec<_> = self.entries.keys().collect();
		sources.sort();
		f.debug_struct("CostSchedule")
			.field("sources", &sources)
			.finish()
	}
}

impl CostSchedule {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with<F>(mut self, source: Source, cost: F) -> Self
	where
		F: Fn(&CostQuery<'_>) -> Amount + Send + Sync + 'static,
	{
		self.entries.insert(source, Arc::new(cost));
		self
	}

	/// Adds a cost that does not depend on the fill.
	pub fn with_constant(self, source: Source, cost: Amount) -> Self {
		self.with(source, move |_| cost)
	}

	pub fn contains(&self, source: Source) -> bool {
		self.entries.contains_key(&source)
	}

	pub fn cost(&self, query: &CostQuery<'_>) -> Amount {
		self.entries
			.get(&query.source)
			.map(|f| f(query))
			.unwrap_or(Decimal::ZERO)
	}

	/// Cost of `source` for a fill carrying no source data.
	pub fn cost_of(&self, source: Source, input: Amount) -> Amount {
		self.cost(&CostQuery {
			source,
			input,
			fill_data: &FillData::Empty,
		})
	}
}

/// Settlement overhead in wei as a function of the sources a path touches.
#[derive(Clone)]
pub struct ExchangeProxyOverhead(Arc<dyn Fn(SourceFlags) -> Amount + Send + Sync>);

impl fmt::Debug for ExchangeProxyOverhead {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ExchangeProxyOverhead")
	}
}

impl Default for ExchangeProxyOverhead {
	fn default() -> Self {
		Self::zero()
	}
}

impl ExchangeProxyOverhead {
	pub fn zero() -> Self {
		Self::from_fn(|_| Decimal::ZERO)
	}

	pub fn from_fn<F>(f: F) -> Self
	where
		F: Fn(SourceFlags) -> Amount + Send + Sync + 'static,
	{
		Self(Arc::new(f))
	}

	pub fn cost(&self, flags: SourceFlags) -> Amount {
		if flags.is_empty() {
			return Decimal::ZERO;
		}
		(self.0)(flags)
	}
}
