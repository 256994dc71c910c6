// Batch-scoped latent semantic vectors.
//
// Fitting a corpus builds three things over the whole batch:
//   1. a dictionary mapping each token to an integer id (first-seen order),
//   2. TF-IDF weights: raw term count * log2(N / document frequency), with
//      each document vector L2-normalized,
//   3. a truncated SVD of the TF-IDF term x document matrix X, keeping at
//      most 100 dimensions.
//
// The SVD is computed from the document Gram matrix XᵀX rather than from X
// itself: its eigenvectors are the right singular vectors V and its
// eigenvalues are σ². The projection of any TF-IDF vector q onto the left
// singular vectors is then Uᵀq = Σ⁻¹ Vᵀ (Xᵀq), which only needs dot products
// against the batch documents. Batches are small (hundreds of topics), so the
// n x n eigenproblem is cheap compared to a vocabulary-sized one.
//
// Nothing here outlives the batch. Vectors from two different fitted corpora
// are not comparable.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use tracing::debug;

/// Maximum rank of the latent space.
pub const LATENT_DIMENSIONS: usize = 100;

/// Eigenvalues below this fraction of the largest one are treated as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// Upper bound on Jacobi sweeps; convergence normally takes well under 20.
const MAX_JACOBI_SWEEPS: usize = 100;

/// Sparse vector as (term id, weight) pairs sorted by term id.
pub type SparseVector = Vec<(usize, f64)>;

/// Dense vector in the fitted latent space.
pub type LatentVector = Array1<f64>;

/// Token -> id mapping plus per-token document frequencies for one batch.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    token_ids: HashMap<String, usize>,
    doc_freqs: Vec<usize>,
}

impl Dictionary {
    fn build(documents: &[Vec<String>]) -> Self {
        let mut dictionary = Self::default();
        for doc in documents {
            let mut seen_in_doc = vec![false; dictionary.doc_freqs.len()];
            for token in doc {
                let next_id = dictionary.token_ids.len();
                let id = *dictionary.token_ids.entry(token.clone()).or_insert(next_id);
                if id == dictionary.doc_freqs.len() {
                    dictionary.doc_freqs.push(0);
                    seen_in_doc.push(false);
                }
                if !seen_in_doc[id] {
                    seen_in_doc[id] = true;
                    dictionary.doc_freqs[id] += 1;
                }
            }
        }
        dictionary
    }

    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.token_ids.get(token).copied()
    }

    /// Bag of words: (token id, count) sorted by id. Unknown tokens are dropped.
    pub fn doc2bow(&self, tokens: &[String]) -> Vec<(usize, u32)> {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for token in tokens {
            if let Some(id) = self.id(token) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut bow: Vec<(usize, u32)> = counts.into_iter().collect();
        bow.sort_by_key(|&(id, _)| id);
        bow
    }
}

/// Fits a latent semantic model over a batch of tokenized documents.
pub struct CorpusVectorizer {
    /// Maximum number of latent dimensions to keep
    pub dimensions: usize,
}

impl Default for CorpusVectorizer {
    fn default() -> Self {
        Self {
            dimensions: LATENT_DIMENSIONS,
        }
    }
}

impl CorpusVectorizer {
    pub fn fit(&self, documents: &[Vec<String>]) -> Corpus {
        let dictionary = Dictionary::build(documents);
        let total_docs = documents.len() as f64;
        let idf: Vec<f64> = dictionary
            .doc_freqs
            .iter()
            .map(|&df| (total_docs / df as f64).log2())
            .collect();

        let mut corpus = Corpus {
            dictionary,
            idf,
            tfidf: Vec::with_capacity(documents.len()),
            components: Array2::zeros((documents.len(), 0)),
            vectors: Vec::with_capacity(documents.len()),
        };

        corpus.tfidf = documents.iter().map(|doc| corpus.tfidf(doc)).collect();

        let gram = gram_matrix(&corpus.tfidf);
        let (eigenvalues, eigenvectors) = jacobi_eigen(gram);

        // Keep the largest eigenpairs above tolerance, ties by position
        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]).then(a.cmp(&b)));
        let largest = order.first().map(|&i| eigenvalues[i]).unwrap_or(0.0);
        let kept: Vec<usize> = order
            .into_iter()
            .filter(|&i| eigenvalues[i] > 0.0 && eigenvalues[i] > largest * RANK_TOLERANCE)
            .take(self.dimensions)
            .collect();

        let sigmas: Vec<f64> = kept.iter().map(|&i| eigenvalues[i].sqrt()).collect();
        corpus.components = Array2::from_shape_fn((documents.len(), kept.len()), |(j, c)| {
            eigenvectors[[j, kept[c]]] / sigmas[c]
        });

        corpus.vectors = corpus.tfidf.iter().map(|v| corpus.project(v)).collect();

        debug!(
            documents = documents.len(),
            vocabulary = corpus.dictionary.len(),
            rank = kept.len(),
            "Fitted latent semantic corpus"
        );

        corpus
    }
}

/// A fitted batch: dictionary, TF-IDF weights, latent projection and the
/// latent vectors of every document in the batch.
pub struct Corpus {
    dictionary: Dictionary,
    idf: Vec<f64>,
    tfidf: Vec<SparseVector>,
    /// n_docs x rank; column c is v_c / σ_c
    components: Array2<f64>,
    vectors: Vec<LatentVector>,
}

impl Corpus {
    /// Number of latent dimensions actually kept (≤ the configured maximum).
    pub fn rank(&self) -> usize {
        self.components.ncols()
    }

    pub fn len(&self) -> usize {
        self.tfidf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tfidf.is_empty()
    }

    /// Latent vectors of the fitted documents, in batch order.
    pub fn vectors(&self) -> &[LatentVector] {
        &self.vectors
    }

    /// L2-normalized TF-IDF weights for a token sequence. Zero weights
    /// (tokens present in every document, or unknown tokens) are dropped.
    pub fn tfidf(&self, tokens: &[String]) -> SparseVector {
        let mut weighted: SparseVector = self
            .dictionary
            .doc2bow(tokens)
            .into_iter()
            .map(|(id, count)| (id, count as f64 * self.idf[id]))
            .filter(|&(_, w)| w != 0.0)
            .collect();

        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut weighted {
                *w /= norm;
            }
        }
        weighted
    }

    /// Project a TF-IDF vector into the latent space.
    pub fn project(&self, weights: &SparseVector) -> LatentVector {
        let against_docs: Array1<f64> = self
            .tfidf
            .iter()
            .map(|doc| sparse_dot(doc, weights))
            .collect();
        self.components.t().dot(&against_docs)
    }

    /// Tokens -> latent vector through the fitted model.
    pub fn transform(&self, tokens: &[String]) -> LatentVector {
        self.project(&self.tfidf(tokens))
    }
}

/// Dot product of two id-sorted sparse vectors.
fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

fn gram_matrix(docs: &[SparseVector]) -> Array2<f64> {
    let n = docs.len();
    let mut gram = Array2::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let dot = sparse_dot(&docs[i], &docs[j]);
            gram[[i, j]] = dot;
            gram[[j, i]] = dot;
        }
    }
    gram
}

/// Cyclic Jacobi eigendecomposition of a symmetric matrix.
///
/// Returns the eigenvalues (unsorted) and a matrix whose columns are the
/// matching unit eigenvectors.
fn jacobi_eigen(mut a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);
    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    if scale == 0.0 {
        return (a.diag().to_owned(), v);
    }

    for _ in 0..MAX_JACOBI_SWEEPS {
        let mut off_diagonal = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off_diagonal += a[[p, q]] * a[[p, q]];
            }
        }
        if off_diagonal.sqrt() <= f64::EPSILON * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (a.diag().to_owned(), v)
}
