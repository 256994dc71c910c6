// Cosine similarity index over a fitted corpus's latent vectors.
//
// Vectors are unit-normalized once at build time so each query is a single
// pass of dot products. A zero vector stays zero and scores 0.0 against
// everything, including itself.

use ndarray::Array1;

use super::vectorizer::LatentVector;

pub struct SimilarityIndex {
    normalized: Vec<Array1<f64>>,
}

impl SimilarityIndex {
    pub fn build(vectors: &[LatentVector]) -> Self {
        Self {
            normalized: vectors.iter().map(unit).collect(),
        }
    }

    /// Similarity of `vector` against every indexed document, as
    /// (batch index, score) sorted by score descending, ties by index.
    pub fn query(&self, vector: &LatentVector) -> Vec<(usize, f64)> {
        let query = unit(vector);
        let mut scores: Vec<(usize, f64)> = self
            .normalized
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, doc.dot(&query)))
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scores
    }
}

fn unit(vector: &LatentVector) -> Array1<f64> {
    let norm = vector.dot(vector).sqrt();
    if norm > 0.0 {
        vector / norm
    } else {
        vector.clone()
    }
}
