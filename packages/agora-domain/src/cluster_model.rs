use std::{cmp::Ordering, collections::BTreeMap};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::vector;

/// Padding applied to the farthest member distance so new points land inside the footprint.
pub const SPREAD_PADDING: f64 = 1.1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
	pub x: f32,
	pub y: f32,
}
impl Point2 {
	pub fn new(x: f32, y: f32) -> Self {
		Self { x, y }
	}

	pub fn distance(&self, other: &Self) -> f64 {
		let dx = f64::from(self.x) - f64::from(other.x);
		let dy = f64::from(self.y) - f64::from(other.y);

		(dx * dx + dy * dy).sqrt()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClusterGeometry {
	pub cluster_index: i32,
	pub centroid_embedding: Vec<f32>,
	pub centroid_2d: Point2,
	pub spread_radius: f32,
	/// Positions into the input slices, in input order.
	pub members: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
	LengthMismatch { labels: usize, embeddings: usize, points: usize },
	NegativeLabel { position: usize, label: i32 },
	NonContiguousLabels { missing: i32 },
	DimensionMismatch { cluster_index: i32 },
}
impl std::fmt::Display for GeometryError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::LengthMismatch { labels, embeddings, points } => write!(
				f,
				"Cluster input lengths disagree: {labels} labels, {embeddings} embeddings, {points} points."
			),
			Self::NegativeLabel { position, label } => {
				write!(f, "Cluster label {label} at position {position} is negative.")
			},
			Self::NonContiguousLabels { missing } => {
				write!(f, "Cluster labels are not contiguous; index {missing} has no members.")
			},
			Self::DimensionMismatch { cluster_index } => {
				write!(f, "Cluster {cluster_index} has embeddings of different dimensions.")
			},
		}
	}
}
impl std::error::Error for GeometryError {}

/// Checks the clustering contract: one 0-based label per input, no gaps. Returns the cluster count.
pub fn validate_cluster_labels(labels: &[i32]) -> Result<usize, GeometryError> {
	let mut max_label = -1;

	for (position, label) in labels.iter().enumerate() {
		if *label < 0 {
			return Err(GeometryError::NegativeLabel { position, label: *label });
		}

		max_label = max_label.max(*label);
	}

	let count = (max_label + 1) as usize;
	let mut seen = vec![false; count];

	for label in labels {
		seen[*label as usize] = true;
	}

	if let Some(missing) = seen.iter().position(|present| !present) {
		return Err(GeometryError::NonContiguousLabels { missing: missing as i32 });
	}

	Ok(count)
}

/// Computes one model per cluster: mean embedding, mean 2D point, and padded spread radius.
/// Output is ordered by cluster index, and members keep input order, so identical input yields
/// identical models.
pub fn build_cluster_models<V>(
	labels: &[i32],
	embeddings: &[V],
	points: &[Point2],
) -> Result<Vec<ClusterGeometry>, GeometryError>
where
	V: AsRef<[f32]>,
{
	if labels.len() != embeddings.len() || labels.len() != points.len() {
		return Err(GeometryError::LengthMismatch {
			labels: labels.len(),
			embeddings: embeddings.len(),
			points: points.len(),
		});
	}

	validate_cluster_labels(labels)?;

	let mut members_by_cluster: BTreeMap<i32, Vec<usize>> = BTreeMap::new();

	for (position, label) in labels.iter().enumerate() {
		members_by_cluster.entry(*label).or_default().push(position);
	}

	let mut models = Vec::with_capacity(members_by_cluster.len());

	for (cluster_index, members) in members_by_cluster {
		let member_vectors: Vec<&[f32]> =
			members.iter().map(|position| embeddings[*position].as_ref()).collect();
		let centroid_embedding = vector::mean_vector(&member_vectors)
			.ok_or(GeometryError::DimensionMismatch { cluster_index })?;
		let member_points: Vec<Point2> =
			members.iter().map(|position| points[*position]).collect();
		let centroid_2d = centroid_2d(&member_points).unwrap_or_default();
		let spread_radius = spread_radius(&member_points, centroid_2d);

		models.push(ClusterGeometry {
			cluster_index,
			centroid_embedding,
			centroid_2d,
			spread_radius,
			members,
		});
	}

	Ok(models)
}

pub fn centroid_2d(points: &[Point2]) -> Option<Point2> {
	if points.is_empty() {
		return None;
	}

	let count = points.len() as f64;
	let (sum_x, sum_y) = points
		.iter()
		.fold((0.0_f64, 0.0_f64), |(x, y), point| (x + f64::from(point.x), y + f64::from(point.y)));

	Some(Point2::new((sum_x / count) as f32, (sum_y / count) as f32))
}

pub fn spread_radius(points: &[Point2], centroid: Point2) -> f32 {
	let max_distance =
		points.iter().map(|point| point.distance(&centroid)).fold(0.0_f64, f64::max);

	(max_distance * SPREAD_PADDING) as f32
}

#[derive(Clone, Copy, Debug)]
pub struct CentroidRef<'a> {
	pub cluster_index: i32,
	pub centroid_embedding: &'a [f32],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assignment {
	pub cluster_index: i32,
	pub distance: f32,
}

/// Minimum cosine distance assignment. Equidistant centroids resolve to the lowest cluster index
/// regardless of input order.
pub fn nearest_cluster(embedding: &[f32], centroids: &[CentroidRef<'_>]) -> Option<Assignment> {
	let mut best: Option<Assignment> = None;

	for centroid in centroids {
		let distance = vector::cosine_distance(embedding, centroid.centroid_embedding);
		let replace = match best {
			None => true,
			Some(current) => match distance.partial_cmp(&current.distance) {
				Some(Ordering::Less) => true,
				Some(Ordering::Equal) => centroid.cluster_index < current.cluster_index,
				_ => false,
			},
		};

		if replace {
			best = Some(Assignment { cluster_index: centroid.cluster_index, distance });
		}
	}

	best
}

/// Uniform sample from the disc of `spread_radius` around `centroid`.
pub fn place_within_spread<R>(centroid: Point2, spread_radius: f32, rng: &mut R) -> Point2
where
	R: Rng,
{
	if spread_radius <= 0.0 || !spread_radius.is_finite() {
		return centroid;
	}

	let angle = rng.gen_range(0.0..std::f64::consts::TAU);
	let radius = f64::from(spread_radius) * rng.gen_range(0.0_f64..1.0).sqrt();

	Point2::new(
		(f64::from(centroid.x) + radius * angle.cos()) as f32,
		(f64::from(centroid.y) + radius * angle.sin()) as f32,
	)
}

/// Picks up to `limit` member positions closest to the cluster centroid, used as naming samples.
pub fn representative_members<V>(
	members: &[usize],
	embeddings: &[V],
	centroid: &[f32],
	limit: usize,
) -> Vec<usize>
where
	V: AsRef<[f32]>,
{
	let mut scored: Vec<(usize, f32)> = members
		.iter()
		.map(|position| {
			let similarity = vector::cosine_similarity(embeddings[*position].as_ref(), centroid);

			(*position, similarity.unwrap_or(-1.0))
		})
		.collect();

	scored.sort_by(|lhs, rhs| rhs.1.total_cmp(&lhs.1).then_with(|| lhs.0.cmp(&rhs.0)));
	scored.truncate(limit);

	scored.into_iter().map(|(position, _)| position).collect()
}

#[cfg(test)]
mod tests {
	use rand::{SeedableRng, rngs::StdRng};

	use super::*;

	#[test]
	fn unit_clusters_produce_exact_centroids() {
		let embeddings = vec![
			vec![1.0_f32, 0.0, 0.0],
			vec![1.0, 0.0, 0.0],
			vec![1.0, 0.0, 0.0],
			vec![0.0, 1.0, 0.0],
			vec![0.0, 1.0, 0.0],
			vec![0.0, 1.0, 0.0],
			vec![0.0, 0.0, 1.0],
			vec![0.0, 0.0, 1.0],
			vec![0.0, 0.0, 1.0],
		];
		let labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
		let points = vec![Point2::default(); 9];
		let models =
			build_cluster_models(&labels, &embeddings, &points).expect("Expected cluster models.");

		assert_eq!(models.len(), 3);
		assert_eq!(models[0].centroid_embedding, vec![1.0, 0.0, 0.0]);
		assert_eq!(models[1].centroid_embedding, vec![0.0, 1.0, 0.0]);
		assert_eq!(models[2].centroid_embedding, vec![0.0, 0.0, 1.0]);
	}

	#[test]
	fn spread_radius_is_padded_max_distance() {
		let points = vec![Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(1.0, 0.0)];
		let embeddings = vec![vec![1.0_f32], vec![1.0], vec![1.0]];
		let models =
			build_cluster_models(&[0, 0, 0], &embeddings, &points).expect("Expected cluster models.");

		assert_eq!(models[0].centroid_2d, Point2::new(1.0, 0.0));
		assert!((models[0].spread_radius - 1.1).abs() < 1e-6);
	}

	#[test]
	fn single_member_cluster_has_zero_spread() {
		let models = build_cluster_models(&[0], &[vec![0.5_f32, 0.5]], &[Point2::new(3.0, 4.0)])
			.expect("Expected cluster models.");

		assert_eq!(models[0].spread_radius, 0.0);
		assert_eq!(models[0].centroid_2d, Point2::new(3.0, 4.0));
	}

	#[test]
	fn rebuilding_from_identical_input_is_deterministic() {
		let embeddings = vec![vec![0.3_f32, 0.7], vec![0.9, 0.1], vec![0.2, 0.8], vec![0.8, 0.3]];
		let points = vec![
			Point2::new(0.1, 0.2),
			Point2::new(5.0, 5.5),
			Point2::new(0.4, 0.0),
			Point2::new(4.5, 5.1),
		];
		let labels = vec![0, 1, 0, 1];
		let first = build_cluster_models(&labels, &embeddings, &points).expect("first");
		let second = build_cluster_models(&labels, &embeddings, &points).expect("second");

		assert_eq!(first, second);
	}

	#[test]
	fn gaps_in_labels_are_rejected() {
		let err = validate_cluster_labels(&[0, 2, 2]).expect_err("Expected contiguity error.");

		assert_eq!(err, GeometryError::NonContiguousLabels { missing: 1 });
	}

	#[test]
	fn negative_labels_are_rejected() {
		let err = validate_cluster_labels(&[0, -1]).expect_err("Expected label error.");

		assert_eq!(err, GeometryError::NegativeLabel { position: 1, label: -1 });
	}

	#[test]
	fn equidistant_centroids_resolve_to_lowest_index() {
		let a = vec![1.0_f32, 0.0];
		let b = vec![0.0_f32, 1.0];
		let centroids = [
			CentroidRef { cluster_index: 4, centroid_embedding: &b },
			CentroidRef { cluster_index: 2, centroid_embedding: &a },
		];
		let assignment =
			nearest_cluster(&[1.0, 1.0], &centroids).expect("Expected an assignment.");

		assert_eq!(assignment.cluster_index, 2);
	}

	#[test]
	fn nearest_cluster_picks_minimum_distance() {
		let a = vec![1.0_f32, 0.0, 0.0];
		let b = vec![0.0_f32, 1.0, 0.0];
		let centroids = [
			CentroidRef { cluster_index: 0, centroid_embedding: &a },
			CentroidRef { cluster_index: 1, centroid_embedding: &b },
		];
		let assignment =
			nearest_cluster(&[0.1, 0.9, 0.0], &centroids).expect("Expected an assignment.");

		assert_eq!(assignment.cluster_index, 1);
	}

	#[test]
	fn placement_stays_inside_spread() {
		let mut rng = StdRng::seed_from_u64(7);
		let centroid = Point2::new(2.0, -1.0);

		for _ in 0..500 {
			let point = place_within_spread(centroid, 1.5, &mut rng);

			assert!(point.distance(&centroid) <= 1.5 + 1e-5);
		}
	}

	#[test]
	fn zero_spread_places_on_centroid() {
		let mut rng = StdRng::seed_from_u64(1);
		let centroid = Point2::new(1.0, 1.0);

		assert_eq!(place_within_spread(centroid, 0.0, &mut rng), centroid);
	}

	#[test]
	fn representatives_prefer_members_near_centroid() {
		let embeddings = vec![vec![1.0_f32, 0.0], vec![0.6, 0.8], vec![0.99, 0.1], vec![0.0, 1.0]];
		let picked = representative_members(&[0, 1, 2, 3], &embeddings, &[1.0, 0.0], 2);

		assert_eq!(picked, vec![0, 2]);
	}
}
