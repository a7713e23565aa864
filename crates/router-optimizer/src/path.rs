//! Search for the best combination of fill prefixes.
//!
//! A path uses a prefix of each source's fill sequence. At most one fill,
//! the last of its prefix, is consumed partially so that the path input
//! matches the target exactly. Two-hop fills are exclusive and only ever
//! form a path on their own.
//!
//! The search is seeded with every single source and with a greedy merge by
//! marginal rate, then runs a depth-first branch and bound over prefix
//! lengths. Bounds come from the fractional relaxation, which ignores fill
//! order within a source and the fixed costs of sources not yet decided. The
//! best few candidates are finally refined by moving single fills between
//! sources.

use router_types::{Amount, Fill, Path, RouterError, Side, Source, SourceFlags};
use rust_decimal::Decimal;
use tracing::{debug, trace};

/// Number of candidates kept for local refinement.
const TOP_CANDIDATES: usize = 4;

/// Values closer than this, in output base units, count as equal.
fn tolerance() -> Decimal {
	Decimal::new(1, 9)
}

/// Haircuts every non-native fill by `slippage`.
///
/// Proceeds shrink on a sell and the amount paid grows on a buy. Native
/// fills execute at their signed price and are left alone.
pub fn apply_bridge_slippage(side: Side, fills: &mut [Vec<Fill>], slippage: Decimal) {
	if slippage.is_zero() {
		return;
	}
	let factor = match side {
		Side::Sell => Decimal::ONE - slippage,
		Side::Buy => Decimal::ONE + slippage,
	};
	for fill in fills.iter_mut().flatten().filter(|f| !f.is_native()) {
		fill.output *= factor;
	}
}

/// Finds the path with the best adjusted output that consumes exactly
/// `target_input`.
///
/// `overhead` prices a source combination in output units. Returns an empty
/// path for a zero target and [`RouterError::NoOptimalPath`] when the fills
/// cannot cover the target.
pub fn find_best_path<F>(
	side: Side,
	fills: &[Vec<Fill>],
	target_input: Amount,
	overhead: F,
	run_limit: usize,
) -> Result<Path, RouterError>
where
	F: Fn(SourceFlags) -> Amount,
{
	if target_input <= Decimal::ZERO {
		return Ok(Path::empty(side));
	}

	let mut search = Search::new(side, fills, target_input, overhead, run_limit);
	search.seed();
	search.branch_and_bound();
	search.refine();

	let best = search.best.first().cloned().ok_or(RouterError::NoOptimalPath)?;
	debug!(
		side = %side,
		sources = ?best.flags.sources(),
		runs = search.runs,
		"Selected path"
	);
	Ok(search.to_path(&best))
}

#[derive(Debug, Clone)]
struct Candidate {
	prefix: Vec<usize>,
	value: Amount,
	flags: SourceFlags,
	/// Group whose last fill is cut, and the input it is cut to.
	trim: Option<(usize, Amount)>,
}

impl Candidate {
	fn is_better_than(&self, other: &Candidate) -> bool {
		let tolerance = tolerance();
		if self.value > other.value + tolerance {
			return true;
		}
		if self.value + tolerance < other.value {
			return false;
		}
		self.flags.count() < other.flags.count()
	}
}

struct Search<'a, F> {
	side: Side,
	groups: Vec<&'a [Fill]>,
	target: Amount,
	overhead: F,
	/// Chainable groups in search order, best head rate first.
	order: Vec<usize>,
	/// Position of each group in `order`, none for two-hop groups.
	position: Vec<Option<usize>>,
	/// Prefix sums of input and penalty per group.
	input_sums: Vec<Vec<Amount>>,
	penalty_sums: Vec<Vec<Amount>>,
	/// Every chainable fill as (group, index, gain rate), best rate first.
	ranked: Vec<(usize, usize, Amount)>,
	best: Vec<Candidate>,
	runs: usize,
	run_limit: usize,
}

impl<'a, F> Search<'a, F>
where
	F: Fn(SourceFlags) -> Amount,
{
	fn new(
		side: Side,
		fills: &'a [Vec<Fill>],
		target: Amount,
		overhead: F,
		run_limit: usize,
	) -> Self {
		let groups: Vec<&[Fill]> = fills
			.iter()
			.filter(|g| !g.is_empty())
			.map(Vec::as_slice)
			.collect();

		let head_rate = |g: usize| adjusted_gain_rate(side, &groups[g][0]);
		let mut order: Vec<usize> = (0..groups.len())
			.filter(|&g| !is_two_hop(groups[g]))
			.collect();
		order.sort_by(|&a, &b| head_rate(b).cmp(&head_rate(a)));

		let mut position = vec![None; groups.len()];
		for (pos, &g) in order.iter().enumerate() {
			position[g] = Some(pos);
		}

		let sums = |value: fn(&Fill) -> Amount| -> Vec<Vec<Amount>> {
			groups
				.iter()
				.map(|g| {
					let mut acc = Decimal::ZERO;
					let mut sums = Vec::with_capacity(g.len() + 1);
					sums.push(acc);
					for fill in g.iter() {
						acc += value(fill);
						sums.push(acc);
					}
					sums
				})
				.collect()
		};
		let input_sums = sums(|f| f.input);
		let penalty_sums = sums(|f| f.penalty);

		let mut ranked: Vec<(usize, usize, Amount)> = order
			.iter()
			.flat_map(|&g| {
				groups[g]
					.iter()
					.enumerate()
					.filter(|(_, f)| f.input > Decimal::ZERO)
					.map(move |(i, f)| (g, i, gain(side, f) / f.input))
			})
			.collect();
		ranked.sort_by(|a, b| b.2.cmp(&a.2));

		Self {
			side,
			groups,
			target,
			overhead,
			order,
			position,
			input_sums,
			penalty_sums,
			ranked,
			best: Vec::with_capacity(TOP_CANDIDATES + 1),
			runs: 0,
			run_limit,
		}
	}

	/// Single sources on their own and a greedy merge of all sources.
	fn seed(&mut self) {
		for g in 0..self.groups.len() {
			let covering = self.input_sums[g].iter().position(|&s| s >= self.target);
			if let Some(k) = covering {
				let mut prefix = vec![0; self.groups.len()];
				prefix[g] = k;
				self.consider(&prefix);
			}
		}

		let mut prefix = vec![0; self.groups.len()];
		let mut input = Decimal::ZERO;
		while input < self.target {
			let next = self
				.order
				.iter()
				.copied()
				.filter(|&g| prefix[g] < self.groups[g].len())
				.max_by(|&a, &b| {
					let rate = |g: usize| adjusted_gain_rate(self.side, &self.groups[g][prefix[g]]);
					// Earlier groups win ties.
					rate(a).cmp(&rate(b)).then(b.cmp(&a))
				});
			let Some(g) = next else {
				break;
			};
			input += self.groups[g][prefix[g]].input;
			prefix[g] += 1;
		}
		if input >= self.target {
			self.consider(&prefix);
		}
		trace!(candidates = self.best.len(), "Seeded path search");
	}

	fn branch_and_bound(&mut self) {
		let mut prefix = vec![0; self.groups.len()];
		self.descend(0, &mut prefix, Decimal::ZERO, Decimal::ZERO);
		if self.runs >= self.run_limit {
			debug!(run_limit = self.run_limit, "Path search hit its run limit");
		}
	}

	fn descend(&mut self, depth: usize, prefix: &mut [usize], input: Amount, penalty: Amount) {
		if self.runs >= self.run_limit {
			return;
		}
		self.runs += 1;

		let excess = input - self.target;
		if excess > Decimal::ZERO && !self.can_trim(prefix, excess) {
			return;
		}
		if depth == self.order.len() {
			self.consider(prefix);
			return;
		}
		let Some(bound) = self.bound(depth, prefix, penalty) else {
			return;
		};
		if let Some(best) = self.best.first() {
			if bound + tolerance() < best.value {
				return;
			}
		}

		let g = self.order[depth];
		for k in (0..=self.groups[g].len()).rev() {
			prefix[g] = k;
			let input = input + self.input_sums[g][k];
			let penalty = penalty + self.penalty_sums[g][k];
			self.descend(depth + 1, prefix, input, penalty);
			if self.runs >= self.run_limit {
				break;
			}
		}
		prefix[g] = 0;
	}

	/// Upper bound on the value of any completion of the decided prefixes.
	///
	/// Returns `None` when no completion can cover the target.
	fn bound(&self, depth: usize, prefix: &[usize], penalty: Amount) -> Option<Amount> {
		let mut capacity = self.target;
		let mut total = Decimal::ZERO;
		for &(g, i, rate) in &self.ranked {
			let decided = self.position[g].is_some_and(|p| p < depth);
			if decided && i >= prefix[g] {
				continue;
			}
			let fill = &self.groups[g][i];
			if fill.input >= capacity {
				total += rate * capacity;
				capacity = Decimal::ZERO;
				break;
			}
			total += gain(self.side, fill);
			capacity -= fill.input;
		}
		if capacity > Decimal::ZERO {
			return None;
		}
		Some(total - penalty)
	}

	fn can_trim(&self, prefix: &[usize], excess: Amount) -> bool {
		prefix
			.iter()
			.enumerate()
			.any(|(g, &k)| k > 0 && self.groups[g][k - 1].input > excess)
	}

	/// Moves single fills between sources while that improves a candidate.
	fn refine(&mut self) {
		let starts = self.best.clone();
		let mut budget = self.run_limit;
		for start in starts {
			let mut current = start;
			loop {
				let mut improved: Option<Candidate> = None;
				for prefix in self.neighbours(&current.prefix) {
					if budget == 0 {
						break;
					}
					budget -= 1;
					if let Some(candidate) = self.evaluate(&prefix) {
						let reference = improved.as_ref().unwrap_or(&current);
						if candidate.is_better_than(reference) {
							improved = Some(candidate);
						}
					}
				}
				match improved {
					Some(candidate) => {
						self.offer(candidate.clone());
						current = candidate;
					}
					None => break,
				}
			}
		}
	}

	fn neighbours(&self, prefix: &[usize]) -> Vec<Vec<usize>> {
		let mut out = Vec::new();
		for &a in &self.order {
			if prefix[a] < self.groups[a].len() {
				let mut grown = prefix.to_vec();
				grown[a] += 1;
				out.push(grown);
			}
			if prefix[a] > 0 {
				let mut shrunk = prefix.to_vec();
				shrunk[a] -= 1;
				out.push(shrunk);
			}
			for &b in &self.order {
				if a != b && prefix[a] < self.groups[a].len() && prefix[b] > 0 {
					let mut moved = prefix.to_vec();
					moved[a] += 1;
					moved[b] -= 1;
					out.push(moved);
				}
			}
		}
		out
	}

	fn consider(&mut self, prefix: &[usize]) {
		if let Some(candidate) = self.evaluate(prefix) {
			self.offer(candidate);
		}
	}

	fn offer(&mut self, candidate: Candidate) {
		if self.best.iter().any(|c| c.prefix == candidate.prefix) {
			return;
		}
		let at = self
			.best
			.iter()
			.position(|c| candidate.is_better_than(c))
			.unwrap_or(self.best.len());
		if at < TOP_CANDIDATES {
			self.best.insert(at, candidate);
			self.best.truncate(TOP_CANDIDATES);
		}
	}

	fn evaluate(&self, prefix: &[usize]) -> Option<Candidate> {
		let used: Vec<usize> = (0..prefix.len()).filter(|&g| prefix[g] > 0).collect();
		if used.len() > 1 && used.iter().any(|&g| is_two_hop(self.groups[g])) {
			return None;
		}

		let mut input = Decimal::ZERO;
		let mut total = Decimal::ZERO;
		let mut penalty = Decimal::ZERO;
		let mut flags = SourceFlags::empty();
		for &g in &used {
			for fill in &self.groups[g][..prefix[g]] {
				input += fill.input;
				total += gain(self.side, fill);
				penalty += fill.penalty;
				flags.insert(fill.source);
			}
		}
		if input < self.target {
			return None;
		}

		let excess = input - self.target;
		let mut trim = None;
		if excess > Decimal::ZERO {
			// Cut the last fill that loses the least.
			let (g, lost) = used
				.iter()
				.filter_map(|&g| {
					let last = &self.groups[g][prefix[g] - 1];
					(last.input > excess)
						.then(|| (g, gain(self.side, last) * (excess / last.input)))
				})
				.min_by(|a, b| a.1.cmp(&b.1))?;
			let last = &self.groups[g][prefix[g] - 1];
			trim = Some((g, last.input - excess));
			total -= lost;
		}

		Some(Candidate {
			prefix: prefix.to_vec(),
			value: total - penalty - (self.overhead)(flags),
			flags,
			trim,
		})
	}

	fn to_path(&self, candidate: &Candidate) -> Path {
		let mut used: Vec<usize> = (0..self.groups.len())
			.filter(|&g| candidate.prefix[g] > 0)
			.collect();
		used.sort_by_key(|&g| self.position[g].unwrap_or(usize::MAX));

		let mut fills = Vec::new();
		for g in used {
			let k = candidate.prefix[g];
			for (i, fill) in self.groups[g][..k].iter().enumerate() {
				match candidate.trim {
					Some((trimmed, input)) if trimmed == g && i + 1 == k => {
						fills.push(fill.clipped(input))
					}
					_ => fills.push(fill.clone()),
				}
			}
		}
		Path::from_fills(self.side, fills, (self.overhead)(candidate.flags))
	}
}

/// Output as a quantity to maximize: proceeds on a sell, negated cost on a
/// buy.
fn gain(side: Side, fill: &Fill) -> Amount {
	match side {
		Side::Sell => fill.output,
		Side::Buy => -fill.output,
	}
}

/// Gain per unit of input after the fill's own fixed cost.
fn adjusted_gain_rate(side: Side, fill: &Fill) -> Amount {
	if fill.input.is_zero() {
		return Decimal::MIN;
	}
	(gain(side, fill) - fill.penalty) / fill.input
}

fn is_two_hop(group: &[Fill]) -> bool {
	group.first().is_some_and(|f| f.source == Source::MultiHop)
}
