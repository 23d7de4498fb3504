use ahash::RandomState;
use indexmap::IndexSet;
use num::{Float, FromPrimitive};

use crate::vectorizer::{corpus::Corpus, term::TermFrequency};

/// Fitted vocabulary; the position of a term is its feature index
pub type Vocabulary = IndexSet<Box<str>, RandomState>;

/// Sparse row: `(feature index, value)`
pub type SparseRow<N> = Vec<(u32, N)>;

pub trait TFIDFEngine<N>
where
    N: Float,
{
    /// IDFベクトルを生成するメソッド
    /// # Arguments
    /// * `corpus` - コーパス
    /// * `vocabulary` - 語彙 (特徴量の次元)
    /// # Returns
    /// * `Vec<N>` - IDFベクトル (語彙順)
    fn idf_vec(corpus: &Corpus, vocabulary: &Vocabulary) -> Vec<N>;
    /// 語彙に含まれる語だけの疎TFベクトル
    fn tf_vec(freq: &TermFrequency, vocabulary: &Vocabulary) -> SparseRow<N>;
    /// TFとIDFを掛け合わせたベクトル
    fn tfidf_vec(tf: SparseRow<N>, idf: &[N]) -> SparseRow<N>;
}

/// デフォルトのTF-IDFエンジン
/// - TF: raw count
/// - IDF: `ln((1 + n) / (1 + df)) + 1`
/// - row: L2 normalized
///
/// `f32`、`f64` の型に対応
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTFIDFEngine;

impl DefaultTFIDFEngine {
    pub fn new() -> Self {
        DefaultTFIDFEngine
    }
}

impl<N> TFIDFEngine<N> for DefaultTFIDFEngine
where
    N: Float + FromPrimitive,
{
    fn idf_vec(corpus: &Corpus, vocabulary: &Vocabulary) -> Vec<N> {
        let doc_num = corpus.get_doc_num() as f64;
        vocabulary
            .iter()
            .map(|term| {
                let doc_freq = corpus.get_doc_freq(term) as f64;
                let idf = ((1.0 + doc_num) / (1.0 + doc_freq)).ln() + 1.0;
                N::from_f64(idf).unwrap_or_else(N::zero)
            })
            .collect()
    }

    fn tf_vec(freq: &TermFrequency, vocabulary: &Vocabulary) -> SparseRow<N> {
        freq.iter()
            .filter_map(|(term, count)| {
                let idx = vocabulary.get_index_of(term)?;
                Some((idx as u32, N::from_u64(count)?))
            })
            .collect()
    }

    fn tfidf_vec(tf: SparseRow<N>, idf: &[N]) -> SparseRow<N> {
        let mut row: SparseRow<N> = tf
            .into_iter()
            .filter_map(|(idx, tf)| idf.get(idx as usize).map(|&idf| (idx, tf * idf)))
            .collect();
        let norm = row.iter().fold(N::zero(), |acc, &(_, v)| acc + v * v).sqrt();
        if norm > N::zero() {
            row.iter_mut().for_each(|(_, v)| *v = *v / norm);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary(terms: &[&str]) -> Vocabulary {
        terms.iter().map(|&t| Box::<str>::from(t)).collect()
    }

    #[test]
    fn idf_is_smoothed() {
        let mut corpus = Corpus::new();
        corpus.add_doc(&TermFrequency::from(&["a", "b"][..]));
        corpus.add_doc(&TermFrequency::from(&["a"][..]));
        let idf: Vec<f64> = DefaultTFIDFEngine::idf_vec(&corpus, &vocabulary(&["a", "b", "unseen"]));
        assert!((idf[0] - 1.0).abs() < 1e-12);
        assert!((idf[1] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
        assert!((idf[2] - (3.0f64.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn out_of_vocabulary_terms_are_ignored() {
        let freq = TermFrequency::from(&["a", "x", "a"][..]);
        let tf: SparseRow<f32> = DefaultTFIDFEngine::tf_vec(&freq, &vocabulary(&["a", "b"]));
        assert_eq!(tf, vec![(0, 2.0)]);
    }

    #[test]
    fn rows_are_unit_length() {
        let row: SparseRow<f64> = DefaultTFIDFEngine::tfidf_vec(vec![(0, 3.0), (1, 4.0)], &[1.0, 1.0]);
        assert_eq!(row, vec![(0, 0.6), (1, 0.8)]);
        let empty: SparseRow<f64> = DefaultTFIDFEngine::tfidf_vec(Vec::new(), &[1.0]);
        assert!(empty.is_empty());
    }
}
