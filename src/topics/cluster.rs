// Greedy nearest-neighbour clustering with an availability mask.
//
// Topics are visited in batch order. The first still-available topic seeds a
// cluster and claims every other available topic whose similarity to it is
// at least SIMILARITY_THRESHOLD. A claimed topic is never reconsidered, even
// if a later seed would have been a closer match. The result therefore
// depends on input order; that is intended behavior and the tests pin it.
//
// The seed matches itself (score ≈ 1.0), but it is already marked
// unavailable before the walk starts, so it isn't added twice.

use tracing::debug;

use super::similarity::SimilarityIndex;
use super::vectorizer::LatentVector;

/// Minimum latent-space cosine similarity for two topics to be merged.
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

pub struct GreedyClusterer<'a> {
    index: &'a SimilarityIndex,
    vectors: &'a [LatentVector],
}

impl<'a> GreedyClusterer<'a> {
    /// `vectors[i]` must be the latent vector of batch topic `i`, from the
    /// same fitted corpus the index was built on.
    pub fn new(index: &'a SimilarityIndex, vectors: &'a [LatentVector]) -> Self {
        Self { index, vectors }
    }

    /// Partition `0..n` into clusters of batch indices. Each cluster starts
    /// with its seed, followed by claimed topics in descending similarity.
    pub fn cluster(&self) -> Vec<Vec<usize>> {
        let mut available = vec![true; self.vectors.len()];
        let mut clusters = Vec::new();

        for (seed, vector) in self.vectors.iter().enumerate() {
            if !available[seed] {
                continue;
            }

            available[seed] = false;
            let mut members = vec![seed];

            for (candidate, score) in self.index.query(vector) {
                if score < SIMILARITY_THRESHOLD {
                    break;
                }
                if available[candidate] {
                    available[candidate] = false;
                    members.push(candidate);
                }
            }

            if members.len() > 1 {
                debug!(seed, size = members.len(), "Clustered duplicate topics");
            }
            clusters.push(members);
        }

        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn run(vectors: Vec<LatentVector>) -> Vec<Vec<usize>> {
        let index = SimilarityIndex::build(&vectors);
        GreedyClusterer::new(&index, &vectors).cluster()
    }

    #[test]
    fn test_singletons_when_orthogonal() {
        let clusters = run(vec![array![1.0, 0.0], array![0.0, 1.0]]);
        assert_eq!(clusters, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_claims_neighbours_above_threshold() {
        let clusters = run(vec![array![1.0, 0.0], array![0.0, 1.0], array![1.0, 0.1]]);
        assert_eq!(clusters, vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_threshold_boundary() {
        // cos = 0.6, merged
        let clusters = run(vec![array![1.0, 0.0], array![0.6, 0.8]]);
        assert_eq!(clusters, vec![vec![0, 1]]);

        // cos = 0.4, kept apart
        let clusters = run(vec![array![1.0, 0.0], array![0.4, 0.84f64.sqrt()]]);
        assert_eq!(clusters, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // |(1,1,1,1)| is exactly 2, so cos is exactly 0.5
        let clusters = run(vec![array![1.0, 0.0, 0.0, 0.0], array![1.0, 1.0, 1.0, 1.0]]);
        assert_eq!(clusters, vec![vec![0, 1]]);
    }

    #[test]
    fn test_order_dependent_claiming() {
        // 1 is close to both 0 and 2, but 0 and 2 are far apart.
        // Seeding from 0 claims 1 first, leaving 2 alone.
        let a = array![1.0, 0.0];
        let b = array![1.0, 1.0];
        let c = array![0.0, 1.0];
        let forward = run(vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(forward, vec![vec![0, 1], vec![2]]);

        // Reverse the batch: now c seeds first and claims b.
        let reversed = run(vec![c, b, a]);
        assert_eq!(reversed, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_zero_vectors_stay_singletons() {
        let clusters = run(vec![array![0.0, 0.0], array![0.0, 0.0]]);
        assert_eq!(clusters, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_empty_batch() {
        assert!(run(Vec::new()).is_empty());
    }
}
