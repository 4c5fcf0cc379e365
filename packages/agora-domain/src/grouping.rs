//! Near-duplicate grouping within a single cluster.
//!
//! Responses are nodes; an undirected edge joins two responses whose embeddings have cosine
//! similarity at or above the threshold. Connected components of at least `min_group_size`
//! members become groups. The pairwise pass is quadratic in the cluster size, so clusters above
//! `large_cluster_threshold` are flagged for callers to report.

use std::collections::VecDeque;

use crate::vector;

#[derive(Clone, Copy, Debug)]
pub struct GroupingOptions {
	pub similarity_threshold: f32,
	pub min_group_size: usize,
	pub large_cluster_threshold: usize,
}
impl Default for GroupingOptions {
	fn default() -> Self {
		Self { similarity_threshold: 0.8, min_group_size: 2, large_cluster_threshold: 300 }
	}
}

#[derive(Clone, Debug)]
pub struct GroupMember<'a, Id> {
	pub id: Id,
	pub embedding: &'a [f32],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimilarityGroup<Id> {
	pub cluster_index: i32,
	pub representative: Id,
	/// Members in input order.
	pub members: Vec<Id>,
}
impl<Id> SimilarityGroup<Id> {
	pub fn size(&self) -> usize {
		self.members.len()
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupingOutcome<Id> {
	pub groups: Vec<SimilarityGroup<Id>>,
	/// Members of components smaller than `min_group_size`, in input order.
	pub ungrouped: Vec<Id>,
	pub large_cluster: bool,
}

pub fn group_similar<Id>(
	cluster_index: i32,
	members: &[GroupMember<'_, Id>],
	options: &GroupingOptions,
) -> GroupingOutcome<Id>
where
	Id: Clone,
{
	let adjacency = build_adjacency(members, options.similarity_threshold);
	let components = connected_components(&adjacency);
	let mut groups = Vec::new();
	let mut ungrouped_positions = Vec::new();

	for component in components {
		if component.len() < options.min_group_size.max(1) {
			ungrouped_positions.extend(component);

			continue;
		}

		let representative = select_representative(members, &component);

		groups.push(SimilarityGroup {
			cluster_index,
			representative: members[representative].id.clone(),
			members: component.iter().map(|position| members[*position].id.clone()).collect(),
		});
	}

	ungrouped_positions.sort_unstable();

	GroupingOutcome {
		groups,
		ungrouped: ungrouped_positions
			.into_iter()
			.map(|position| members[position].id.clone())
			.collect(),
		large_cluster: members.len() > options.large_cluster_threshold,
	}
}

fn build_adjacency<Id>(members: &[GroupMember<'_, Id>], threshold: f32) -> Vec<Vec<usize>> {
	let mut adjacency = vec![Vec::new(); members.len()];

	for i in 0..members.len() {
		for j in (i + 1)..members.len() {
			let Some(similarity) =
				vector::cosine_similarity(members[i].embedding, members[j].embedding)
			else {
				continue;
			};

			if similarity >= threshold {
				adjacency[i].push(j);
				adjacency[j].push(i);
			}
		}
	}

	adjacency
}

/// Breadth-first components. Components are discovered from the lowest unvisited position and
/// their members are returned sorted, so the output depends only on input order.
fn connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
	let mut visited = vec![false; adjacency.len()];
	let mut components = Vec::new();

	for start in 0..adjacency.len() {
		if visited[start] {
			continue;
		}

		let mut component = Vec::new();
		let mut queue = VecDeque::from([start]);

		visited[start] = true;

		while let Some(node) = queue.pop_front() {
			component.push(node);

			for next in &adjacency[node] {
				if !visited[*next] {
					visited[*next] = true;

					queue.push_back(*next);
				}
			}
		}

		component.sort_unstable();
		components.push(component);
	}

	components
}

/// Member with the highest cosine similarity to the unit-normalized mean of the component.
fn select_representative<Id>(members: &[GroupMember<'_, Id>], component: &[usize]) -> usize {
	let vectors: Vec<&[f32]> =
		component.iter().map(|position| members[*position].embedding).collect();
	let Some(centroid) = vector::mean_vector(&vectors).and_then(|mean| vector::normalize(&mean))
	else {
		return component[0];
	};
	let mut best = component[0];
	let mut best_similarity = f32::NEG_INFINITY;

	for position in component {
		let similarity =
			vector::cosine_similarity(members[*position].embedding, &centroid).unwrap_or(-1.0);

		if similarity > best_similarity {
			best = *position;
			best_similarity = similarity;
		}
	}

	best
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn isolated_members_are_ungrouped() {
		let a = vec![1.0_f32, 0.0];
		let b = vec![0.0_f32, 1.0];
		let members =
			vec![GroupMember { id: "a", embedding: &a }, GroupMember { id: "b", embedding: &b }];
		let outcome = group_similar(0, &members, &GroupingOptions::default());

		assert!(outcome.groups.is_empty());
		assert_eq!(outcome.ungrouped, vec!["a", "b"]);
		assert!(!outcome.large_cluster);
	}

	#[test]
	fn chained_similarity_forms_one_component() {
		// a~b and b~c clear the threshold while a~c does not.
		let a = vec![1.0_f32, 0.0];
		let b = vec![0.9_f32, 0.435_889_9];
		let c = vec![0.62_f32, 0.784_602];
		let members = vec![
			GroupMember { id: 1, embedding: &a },
			GroupMember { id: 2, embedding: &b },
			GroupMember { id: 3, embedding: &c },
		];
		let outcome = group_similar(4, &members, &GroupingOptions::default());

		assert_eq!(outcome.groups.len(), 1);
		assert_eq!(outcome.groups[0].members, vec![1, 2, 3]);
		assert_eq!(outcome.groups[0].representative, 2);
		assert_eq!(outcome.groups[0].cluster_index, 4);
	}

	#[test]
	fn large_clusters_are_flagged() {
		let v = vec![1.0_f32, 0.0];
		let members: Vec<GroupMember<'_, usize>> =
			(0..4).map(|id| GroupMember { id, embedding: v.as_slice() }).collect();
		let options =
			GroupingOptions { large_cluster_threshold: 3, ..GroupingOptions::default() };
		let outcome = group_similar(0, &members, &options);

		assert!(outcome.large_cluster);
		assert_eq!(outcome.groups.len(), 1);
		assert_eq!(outcome.groups[0].size(), 4);
	}
}
