pub mod corpus;
pub mod extract;
pub mod report;
pub mod term;
pub mod tfidf;

use std::marker::PhantomData;

use num::{Float, FromPrimitive};

use crate::utils::sort::top_n_by_score;
use crate::vectorizer::{
    corpus::Corpus,
    report::{KeywordEntry, KeywordList},
    term::TermFrequency,
    tfidf::{DefaultTFIDFEngine, SparseRow, TFIDFEngine, Vocabulary},
};

/// Decimal digits kept in reported scores
const SCORE_DECIMALS: i32 = 3;

/// TF-IDF scorer with a capped vocabulary.
///
/// `fit` builds the vocabulary and IDF vector from a set of documents;
/// `top_terms` then ranks the terms of any document against it.
#[derive(Debug, Clone)]
pub struct KeywordVectorizer<N = f64, E = DefaultTFIDFEngine>
where
    N: Float + FromPrimitive + Into<f64> + Send + Sync,
    E: TFIDFEngine<N> + Send + Sync,
{
    /// vocabulary cap
    max_features: usize,
    /// fitted vocabulary, first-seen order
    vocabulary: Vocabulary,
    /// IDF Vector, vocabulary order
    idf_vec: Vec<N>,
    /// documents seen by the last fit
    doc_num: u64,
    _marker: PhantomData<E>,
}

impl<N, E> KeywordVectorizer<N, E>
where
    N: Float + FromPrimitive + Into<f64> + Send + Sync,
    E: TFIDFEngine<N> + Send + Sync,
{
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: Vocabulary::default(),
            idf_vec: Vec::new(),
            doc_num: 0,
            _marker: PhantomData,
        }
    }

    /// Refit vocabulary and IDF on `docs`, replacing any previous fit.
    pub fn fit<'a, I>(&mut self, docs: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a TermFrequency>,
    {
        let mut corpus = Corpus::new();
        for doc in docs {
            corpus.add_doc(doc);
        }
        self.vocabulary = corpus
            .frequent_terms(self.max_features)
            .into_iter()
            .map(Box::<str>::from)
            .collect();
        self.idf_vec = E::idf_vec(&corpus, &self.vocabulary);
        self.doc_num = corpus.get_doc_num();
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[N] {
        &self.idf_vec
    }

    pub fn doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Sparse TF-IDF row of `doc` against the fitted vocabulary
    pub fn transform(&self, doc: &TermFrequency) -> SparseRow<N> {
        E::tfidf_vec(E::tf_vec(doc, &self.vocabulary), &self.idf_vec)
    }

    /// The `n` best terms of `doc`.
    /// Scores are rounded to 3 decimals before ranking, so equal reported
    /// scores keep vocabulary order. Terms whose rounded score is 0 are left
    /// out and the list may be shorter than `n`.
    pub fn top_terms(&self, doc: &TermFrequency, n: usize) -> KeywordList {
        let rounded: Vec<(u32, f64)> = self
            .transform(doc)
            .into_iter()
            .map(|(idx, score)| (idx, round_score(score.into())))
            .filter(|&(_, score)| score > 0.0)
            .collect();
        top_n_by_score(rounded, n)
            .into_iter()
            .filter_map(|(idx, score)| {
                let term = self.vocabulary.get_index(idx as usize)?;
                Some(KeywordEntry::new(term.to_string(), score))
            })
            .collect()
    }
}

#[inline]
fn round_score(score: f64) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    (score * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tf(terms: &[&str]) -> TermFrequency {
        TermFrequency::from(terms)
    }

    #[test]
    fn vocabulary_is_capped_by_frequency() {
        let docs = [tf(&["a", "b", "b"]), tf(&["c", "b", "c"])];
        let mut v: KeywordVectorizer = KeywordVectorizer::new(2);
        v.fit(&docs);
        let vocab: Vec<&str> = v.vocabulary().iter().map(|t| &**t).collect();
        assert_eq!(vocab, ["b", "c"]);
        assert_eq!(v.doc_num(), 2);
    }

    #[test]
    fn shared_terms_rank_below_distinctive_ones() {
        let docs = [tf(&["chung", "riêng"]), tf(&["chung", "khác"])];
        let mut v: KeywordVectorizer = KeywordVectorizer::new(100);
        v.fit(&docs);
        let list = v.top_terms(&docs[0], 5);
        assert_eq!(list.terms(), ["riêng", "chung"]);
        assert!(list.0[0].score > list.0[1].score);
    }

    #[test]
    fn equal_scores_keep_vocabulary_order() {
        let docs = [tf(&["y", "x"])];
        let mut v: KeywordVectorizer<f32> = KeywordVectorizer::new(10);
        v.fit(&docs);
        let list = v.top_terms(&docs[0], 2);
        assert_eq!(list.terms(), ["y", "x"]);
        assert_eq!(list.0[0].score, 0.707);
    }

    #[test]
    fn ties_are_judged_on_the_rounded_score() {
        // raw scores differ only past the third decimal
        let mut terms = vec!["a"; 10_000];
        terms.extend(std::iter::repeat("b").take(10_001));
        let docs = [tf(&terms)];
        let mut v: KeywordVectorizer = KeywordVectorizer::new(10);
        v.fit(&docs);
        let list = v.top_terms(&docs[0], 2);
        assert_eq!(list.terms(), ["a", "b"]);
        assert_eq!(list.0[0].score, list.0[1].score);
        assert_eq!(v.top_terms(&docs[0], 1).terms(), ["a"]);
    }

    #[test]
    fn unknown_document_yields_empty_list() {
        let mut v: KeywordVectorizer = KeywordVectorizer::new(10);
        v.fit(&[tf(&["a"])]);
        assert!(v.top_terms(&tf(&["z"]), 3).is_empty());
        assert!(v.top_terms(&tf(&["a"]), 0).is_empty());
    }

    #[test]
    fn rounding_keeps_three_decimals() {
        assert_eq!(round_score(0.12345), 0.123);
        assert_eq!(round_score(0.0004), 0.0);
    }
}
