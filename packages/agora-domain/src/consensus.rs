//! Agreement statistics over feedback votes. Everything here is pure and order preserving.

use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const AGREEMENT_MIN_PERCENT: u32 = 70;
pub const DIVISIVE_MIN_AGREE_PERCENT: u32 = 40;
pub const DIVISIVE_MAX_AGREE_PERCENT: u32 = 60;
pub const DIVISIVE_MIN_DISAGREE_PERCENT: u32 = 35;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteValue {
	Agree,
	Pass,
	Disagree,
}
impl VoteValue {
	/// Exact match on the stored vocabulary. Anything else is not a vote.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"agree" => Some(Self::Agree),
			"pass" => Some(Self::Pass),
			"disagree" => Some(Self::Disagree),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Agree => "agree",
			Self::Pass => "pass",
			Self::Disagree => "disagree",
		}
	}
}

/// A stored vote. `value` is kept raw so unrecognized values can be skipped instead of rejected.
#[derive(Clone, Debug)]
pub struct Vote {
	pub target_id: Uuid,
	pub user_id: String,
	pub value: String,
}

#[derive(Clone, Copy, Debug)]
pub struct ConsensusTarget<'a> {
	pub id: Uuid,
	pub text: &'a str,
}

#[derive(Clone, Copy, Debug)]
pub struct Bucket<'a> {
	pub id: Uuid,
	pub text: &'a str,
	/// Ordered members; the first one is the representative shown to voters.
	pub member_ids: &'a [Uuid],
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
	pub agree_votes: u32,
	pub pass_votes: u32,
	pub disagree_votes: u32,
	pub total_votes: u32,
}
impl VoteTally {
	fn record(&mut self, value: VoteValue) {
		match value {
			VoteValue::Agree => self.agree_votes += 1,
			VoteValue::Pass => self.pass_votes += 1,
			VoteValue::Disagree => self.disagree_votes += 1,
		}

		self.total_votes += 1;
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Percentages {
	pub agree_percent: u32,
	pub pass_percent: u32,
	pub disagree_percent: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConsensus {
	pub response_id: Uuid,
	pub text: String,
	#[serde(flatten)]
	pub tally: VoteTally,
	#[serde(flatten)]
	pub percentages: Percentages,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketConsensus {
	pub bucket_id: Uuid,
	pub text: String,
	pub representative_id: Option<Uuid>,
	pub member_count: usize,
	#[serde(flatten)]
	pub tally: VoteTally,
	#[serde(flatten)]
	pub percentages: Percentages,
}

#[derive(Clone, Copy, Debug)]
pub struct SummaryOptions {
	pub min_votes: u32,
	pub max_per_type: usize,
}
impl Default for SummaryOptions {
	fn default() -> Self {
		Self { min_votes: 5, max_per_type: 5 }
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementSummaries {
	pub agreement: Vec<ResponseConsensus>,
	pub divisive: Vec<ResponseConsensus>,
}

pub fn tally_votes(votes: &[Vote]) -> HashMap<Uuid, VoteTally> {
	let mut tallies: HashMap<Uuid, VoteTally> = HashMap::new();

	for vote in votes {
		let Some(value) = VoteValue::parse(&vote.value) else { continue };

		tallies.entry(vote.target_id).or_default().record(value);
	}

	tallies
}

/// Agree and disagree are rounded independently and pass takes the remainder, so the three always
/// sum to 100. Disagree is capped at `100 - agree` when both round up past the total.
pub fn percentages(tally: &VoteTally) -> Option<Percentages> {
	if tally.total_votes == 0 {
		return None;
	}

	let agree_percent = rounded_percent(tally.agree_votes, tally.total_votes);
	let disagree_percent =
		rounded_percent(tally.disagree_votes, tally.total_votes).min(100 - agree_percent);

	Some(Percentages {
		agree_percent,
		pass_percent: 100 - agree_percent - disagree_percent,
		disagree_percent,
	})
}

/// Per-response view. Responses without any recognized vote are left out.
pub fn compute_response_consensus(
	targets: &[ConsensusTarget<'_>],
	votes: &[Vote],
) -> Vec<ResponseConsensus> {
	let tallies = tally_votes(votes);

	targets
		.iter()
		.filter_map(|target| {
			let tally = tallies.get(&target.id).copied()?;
			let percentages = percentages(&tally)?;

			Some(ResponseConsensus {
				response_id: target.id,
				text: target.text.to_string(),
				tally,
				percentages,
			})
		})
		.collect()
}

/// Per-bucket view. Only votes cast on the bucket's first member count; votes on other members
/// are never merged in. Buckets with votes come first, then the rest, each part in input order.
pub fn compute_consolidated_consensus(
	buckets: &[Bucket<'_>],
	votes: &[Vote],
) -> Vec<BucketConsensus> {
	let tallies = tally_votes(votes);
	let (voted, unvoted): (Vec<BucketConsensus>, Vec<BucketConsensus>) = buckets
		.iter()
		.map(|bucket| {
			let representative_id = bucket.member_ids.first().copied();
			let tally = representative_id
				.and_then(|id| tallies.get(&id).copied())
				.unwrap_or_default();

			BucketConsensus {
				bucket_id: bucket.id,
				text: bucket.text.to_string(),
				representative_id,
				member_count: bucket.member_ids.len(),
				tally,
				percentages: percentages(&tally).unwrap_or_default(),
			}
		})
		.partition(|consensus| consensus.tally.total_votes > 0);

	voted.into_iter().chain(unvoted).collect()
}

pub fn compute_agreement_summaries(
	consensus: &[ResponseConsensus],
	options: &SummaryOptions,
) -> AgreementSummaries {
	let mut agreement = Vec::new();
	let mut divisive = Vec::new();

	for item in consensus.iter().filter(|item| item.tally.total_votes >= options.min_votes) {
		if is_agreement(&item.percentages) {
			agreement.push(item.clone());
		} else if is_divisive(&item.percentages) {
			divisive.push(item.clone());
		}
	}

	agreement.sort_by(compare_agreement);
	divisive.sort_by(compare_divisive);
	agreement.truncate(options.max_per_type);
	divisive.truncate(options.max_per_type);

	AgreementSummaries { agreement, divisive }
}

pub fn is_agreement(percentages: &Percentages) -> bool {
	percentages.agree_percent >= AGREEMENT_MIN_PERCENT
}

/// The agree band tops out at 60, below the agreement floor, so the two classes never overlap.
pub fn is_divisive(percentages: &Percentages) -> bool {
	(DIVISIVE_MIN_AGREE_PERCENT..=DIVISIVE_MAX_AGREE_PERCENT).contains(&percentages.agree_percent)
		&& percentages.disagree_percent >= DIVISIVE_MIN_DISAGREE_PERCENT
}

fn rounded_percent(count: u32, total: u32) -> u32 {
	((f64::from(count) * 100.0) / f64::from(total)).round() as u32
}

fn compare_agreement(lhs: &ResponseConsensus, rhs: &ResponseConsensus) -> Ordering {
	rhs.percentages
		.agree_percent
		.cmp(&lhs.percentages.agree_percent)
		.then_with(|| rhs.tally.total_votes.cmp(&lhs.tally.total_votes))
		.then_with(|| lhs.response_id.cmp(&rhs.response_id))
}

fn compare_divisive(lhs: &ResponseConsensus, rhs: &ResponseConsensus) -> Ordering {
	let balance = |item: &ResponseConsensus| item.percentages.agree_percent.abs_diff(50);
	let minority =
		|item: &ResponseConsensus| item.tally.agree_votes.min(item.tally.disagree_votes);

	balance(lhs)
		.cmp(&balance(rhs))
		.then_with(|| minority(rhs).cmp(&minority(lhs)))
		.then_with(|| rhs.tally.total_votes.cmp(&lhs.tally.total_votes))
		.then_with(|| lhs.response_id.cmp(&rhs.response_id))
}
