use uuid::Uuid;

use agora_domain::{
	cluster_model::{self, Point2},
	consensus::{self, ConsensusTarget, SummaryOptions, Vote},
	grouping::{self, GroupMember, GroupingOptions},
	status::{AnalysisStatus, AnalysisStrategy, StrategyRequest, TriggerMode},
	strategy::{self, ResponseCounts},
};

fn votes_for(target_id: Uuid, agree: usize, pass: usize, disagree: usize) -> Vec<Vote> {
	let mut votes = Vec::new();
	let values = std::iter::repeat_n("agree", agree)
		.chain(std::iter::repeat_n("pass", pass))
		.chain(std::iter::repeat_n("disagree", disagree));

	for (idx, value) in values.enumerate() {
		votes.push(Vote { target_id, user_id: format!("user-{idx}"), value: value.to_string() });
	}

	votes
}

fn auto_strategy(counts: ResponseCounts, cluster_models: i64) -> AnalysisStrategy {
	strategy::decide_strategy(
		StrategyRequest::Auto,
		TriggerMode::Manual,
		counts.new_since_analysis(),
		10,
		cluster_models,
	)
}

#[test]
fn strategy_matrix_follows_new_response_count_and_models() {
	assert_eq!(
		auto_strategy(ResponseCounts { current: 25, analyzed: 20 }, 3),
		AnalysisStrategy::Incremental
	);
	assert_eq!(auto_strategy(ResponseCounts { current: 35, analyzed: 20 }, 3), AnalysisStrategy::Full);
	assert_eq!(auto_strategy(ResponseCounts { current: 25, analyzed: 20 }, 0), AnalysisStrategy::Full);
}

#[test]
fn ready_and_fully_analyzed_is_fresh() {
	let counts = ResponseCounts { current: 25, analyzed: 25 };

	assert!(strategy::is_fresh(AnalysisStatus::Ready, &counts));
	assert_eq!(counts.new_since_analysis(), 0);
}

#[test]
fn three_triplets_form_three_groups() {
	let axes = [[1.0_f32, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
	let embeddings: Vec<Vec<f32>> =
		axes.iter().flat_map(|axis| std::iter::repeat_n(axis.to_vec(), 3)).collect();
	let members: Vec<GroupMember<'_, usize>> = embeddings
		.iter()
		.enumerate()
		.map(|(id, embedding)| GroupMember { id, embedding: embedding.as_slice() })
		.collect();
	let options = GroupingOptions {
		similarity_threshold: 0.8,
		min_group_size: 2,
		..GroupingOptions::default()
	};
	let outcome = grouping::group_similar(0, &members, &options);

	assert_eq!(outcome.groups.len(), 3);
	assert!(outcome.groups.iter().all(|group| group.size() == 3));
	assert!(outcome.ungrouped.is_empty());
	assert_eq!(outcome.groups[1].members, vec![3, 4, 5]);
}

#[test]
fn unit_axis_clusters_have_unit_centroids() {
	let axes = [[1.0_f32, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
	let embeddings: Vec<Vec<f32>> =
		axes.iter().flat_map(|axis| std::iter::repeat_n(axis.to_vec(), 3)).collect();
	let labels = [0, 0, 0, 1, 1, 1, 2, 2, 2];
	let points = vec![Point2::default(); 9];
	let models = cluster_model::build_cluster_models(&labels, &embeddings, &points)
		.expect("Failed to build cluster models.");

	assert_eq!(models.len(), 3);

	for (model, axis) in models.iter().zip(axes.iter()) {
		assert_eq!(model.centroid_embedding, axis.to_vec());
	}
}

#[test]
fn collinear_points_pad_the_spread() {
	let labels = [0, 0, 0];
	let embeddings = vec![vec![1.0_f32, 0.0]; 3];
	let points = [Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(1.0, 0.0)];
	let models = cluster_model::build_cluster_models(&labels, &embeddings, &points)
		.expect("Failed to build cluster models.");

	assert_eq!(models[0].centroid_2d, Point2::new(1.0, 0.0));
	assert!((models[0].spread_radius - 1.1).abs() < 1e-6);
}

#[test]
fn percentages_sum_to_one_hundred_for_every_voted_response() {
	let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
	let shapes = [(1, 1, 1), (2, 0, 1), (1, 0, 7), (0, 3, 0), (5, 2, 2), (0, 0, 0)];
	let mut votes = Vec::new();

	for (id, (agree, pass, disagree)) in ids.iter().zip(shapes) {
		votes.extend(votes_for(*id, agree, pass, disagree));
	}

	let targets: Vec<ConsensusTarget<'_>> =
		ids.iter().map(|id| ConsensusTarget { id: *id, text: "text" }).collect();
	let consensus = consensus::compute_response_consensus(&targets, &votes);

	assert_eq!(consensus.len(), 5);
	assert!(consensus.iter().all(|item| item.response_id != ids[5]));

	for item in &consensus {
		let percentages = item.percentages;

		assert_eq!(
			percentages.agree_percent + percentages.pass_percent + percentages.disagree_percent,
			100
		);
	}
}

#[test]
fn agreement_and_divisive_lists_are_disjoint() {
	let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
	let shapes = [(8, 1, 1), (5, 0, 5), (4, 2, 4), (7, 0, 3), (2, 2, 1)];
	let mut votes = Vec::new();

	for (id, (agree, pass, disagree)) in ids.iter().zip(shapes) {
		votes.extend(votes_for(*id, agree, pass, disagree));
	}

	let targets: Vec<ConsensusTarget<'_>> =
		ids.iter().map(|id| ConsensusTarget { id: *id, text: "text" }).collect();
	let consensus = consensus::compute_response_consensus(&targets, &votes);
	let summaries = consensus::compute_agreement_summaries(&consensus, &SummaryOptions::default());
	let agreement: Vec<Uuid> = summaries.agreement.iter().map(|item| item.response_id).collect();
	let divisive: Vec<Uuid> = summaries.divisive.iter().map(|item| item.response_id).collect();

	assert_eq!(agreement, vec![ids[0], ids[3]]);
	assert_eq!(divisive, vec![ids[1], ids[2]]);
	assert!(agreement.iter().all(|id| !divisive.contains(id)));
}

#[test]
fn bucket_votes_only_count_the_first_member() {
	let representative = Uuid::new_v4();
	let other_member = Uuid::new_v4();
	let quiet_representative = Uuid::new_v4();
	let voted_members = [representative, other_member];
	let quiet_members = [quiet_representative];
	let buckets = [
		consensus::Bucket { id: Uuid::new_v4(), text: "quiet", member_ids: &quiet_members },
		consensus::Bucket { id: Uuid::new_v4(), text: "voted", member_ids: &voted_members },
	];
	let mut votes = votes_for(representative, 2, 0, 0);

	votes.extend(votes_for(other_member, 0, 0, 4));

	let consensus = consensus::compute_consolidated_consensus(&buckets, &votes);

	assert_eq!(consensus[0].text, "voted");
	assert_eq!(consensus[0].tally.total_votes, 2);
	assert_eq!(consensus[0].percentages.agree_percent, 100);
	assert_eq!(consensus[1].text, "quiet");
	assert_eq!(consensus[1].tally.total_votes, 0);
}
