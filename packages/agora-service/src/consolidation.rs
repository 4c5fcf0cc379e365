//! Near-duplicate responses within a cluster become one synthesized statement.

use std::collections::HashMap;

use time::OffsetDateTime;
use uuid::Uuid;

use agora_domain::grouping::{self, GroupMember, GroupingOptions, SimilarityGroup};
use agora_providers::llm::CONSOLIDATE_PROMPT_VERSION;
use agora_storage::models::ConsolidatedStatement;

use crate::{AgoraService, Result, retry};

#[derive(Clone, Copy, Debug)]
pub struct MemberInput<'a> {
	pub response_id: Uuid,
	pub text: &'a str,
	pub embedding: &'a [f32],
}

#[derive(Clone, Debug)]
pub struct ClusterInput<'a> {
	pub cluster_index: i32,
	/// Members in response creation order.
	pub members: Vec<MemberInput<'a>>,
}

#[derive(Clone, Debug, Default)]
pub struct Consolidation {
	pub statements: Vec<ConsolidatedStatement>,
	/// Responses left as they are because no near-duplicate was found.
	pub unconsolidated: Vec<Uuid>,
	pub large_clusters: Vec<i32>,
}

impl AgoraService {
	/// Groups each cluster and synthesizes one statement per group. Nothing is persisted here.
	pub async fn consolidate(
		&self,
		conversation_id: Uuid,
		clusters: &[ClusterInput<'_>],
	) -> Result<Consolidation> {
		let options = grouping_options(&self.cfg.analysis);
		let policy = retry::RetryPolicy::from(&self.cfg.worker.retry);
		let llm = &self.cfg.providers.llm;
		let mut out = Consolidation::default();

		for cluster in clusters {
			let members: Vec<GroupMember<'_, Uuid>> = cluster
				.members
				.iter()
				.map(|member| GroupMember { id: member.response_id, embedding: member.embedding })
				.collect();
			let outcome = grouping::group_similar(cluster.cluster_index, &members, &options);

			if outcome.large_cluster {
				tracing::warn!(
					conversation_id = %conversation_id,
					cluster_index = cluster.cluster_index,
					members = members.len(),
					"Large cluster grouped with the exact pairwise pass."
				);
				out.large_clusters.push(cluster.cluster_index);
			}

			let texts: HashMap<Uuid, &str> =
				cluster.members.iter().map(|member| (member.response_id, member.text)).collect();

			for group in outcome.groups {
				let ordered = representative_first(&group);
				let group_texts: Vec<String> = ordered
					.iter()
					.map(|id| texts.get(id).copied().unwrap_or_default().to_string())
					.collect();
				let statement = retry::with_retry(&policy, "synthesize", || {
					self.providers.synthesis.synthesize(llm, group.cluster_index, &group_texts)
				})
				.await?;

				out.statements.push(ConsolidatedStatement {
					statement_id: Uuid::new_v4(),
					conversation_id,
					group_id: group_id(conversation_id, group.cluster_index, group.representative),
					cluster_index: group.cluster_index,
					statement,
					provenance: provenance(&ordered, &texts),
					combined_response_ids: ordered,
					model: llm.model.clone(),
					prompt_version: CONSOLIDATE_PROMPT_VERSION.to_string(),
					created_at: OffsetDateTime::now_utc(),
				});
			}

			out.unconsolidated.extend(outcome.ungrouped);
		}

		tracing::info!(
			conversation_id = %conversation_id,
			statements = out.statements.len(),
			unconsolidated = out.unconsolidated.len(),
			"Consolidated near-duplicate responses."
		);

		Ok(out)
	}
}

pub fn grouping_options(cfg: &agora_config::Analysis) -> GroupingOptions {
	GroupingOptions {
		similarity_threshold: cfg.similarity_threshold,
		min_group_size: cfg.min_group_size as usize,
		large_cluster_threshold: cfg.large_cluster_threshold as usize,
	}
}

/// Stable across reruns over the same grouping.
pub fn group_id(conversation_id: Uuid, cluster_index: i32, representative: Uuid) -> Uuid {
	Uuid::new_v5(&conversation_id, format!("{cluster_index}:{representative}").as_bytes())
}

fn representative_first(group: &SimilarityGroup<Uuid>) -> Vec<Uuid> {
	let mut ordered = Vec::with_capacity(group.size());

	ordered.push(group.representative);
	ordered.extend(group.members.iter().copied().filter(|id| *id != group.representative));

	ordered
}

/// Audit trail of the source responses, `id: text` joined by ` | `.
fn provenance(ids: &[Uuid], texts: &HashMap<Uuid, &str>) -> String {
	ids.iter()
		.map(|id| format!("{id}: {}", texts.get(id).copied().unwrap_or_default()))
		.collect::<Vec<_>>()
		.join(" | ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn representative_leads_member_order() {
		let ids: Vec<Uuid> = (1..=3).map(Uuid::from_u128).collect();
		let group =
			SimilarityGroup { cluster_index: 0, representative: ids[1], members: ids.clone() };

		assert_eq!(representative_first(&group), vec![ids[1], ids[0], ids[2]]);
	}

	#[test]
	fn provenance_lists_ids_with_texts() {
		let a = Uuid::from_u128(1);
		let b = Uuid::from_u128(2);
		let texts = HashMap::from([(a, "More buses"), (b, "Add bus routes")]);

		assert_eq!(provenance(&[a, b], &texts), format!("{a}: More buses | {b}: Add bus routes"));
	}

	#[test]
	fn group_ids_are_deterministic() {
		let conversation = Uuid::from_u128(9);
		let representative = Uuid::from_u128(4);

		let first = group_id(conversation, 2, representative);

		assert_eq!(first, group_id(conversation, 2, representative));
		assert_ne!(first, group_id(conversation, 3, representative));
	}
}
