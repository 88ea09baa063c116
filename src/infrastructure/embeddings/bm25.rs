//! BM25 sparse encoder compatible with Pinecone's `pinecone-text` tooling.
//!
//! Tokens are hashed with unsigned 32-bit MurmurHash3 (seed 0), so vectors
//! produced here line up with vectors produced by the Python encoder, and
//! parameter files can be exchanged in either direction.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tokenizer::{Bm25Tokenizer, TokenizerOptions};
use crate::application::services::SparseEncoder;
use crate::domain::{SetupError, SparseVector};

pub const DEFAULT_B: f64 = 0.75;
pub const DEFAULT_K1: f64 = 1.2;

/// Serialised encoder state, using the `pinecone-text` JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub avgdl: f64,
    pub n_docs: u64,
    pub doc_freq: DocFreq,
    pub b: f64,
    pub k1: f64,
    pub lower_case: bool,
    pub remove_punctuation: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocFreq {
    pub indices: Vec<u32>,
    pub values: Vec<f64>,
}

/// Corpus statistics gathered by [`Bm25Encoder::fit`].
#[derive(Debug, Clone)]
struct CorpusStats {
    doc_freq: HashMap<u32, f64>,
    n_docs: u64,
    avgdl: f64,
}

pub struct Bm25Encoder {
    b: f64,
    k1: f64,
    tokenizer: Bm25Tokenizer,
    stats: Option<CorpusStats>,
}

impl Bm25Encoder {
    /// Untrained encoder with default parameters.
    pub fn new() -> Result<Self, SetupError> {
        Self::with_options(DEFAULT_B, DEFAULT_K1, TokenizerOptions::default())
    }

    pub fn with_options(b: f64, k1: f64, options: TokenizerOptions) -> Result<Self, SetupError> {
        if !(0.0..=1.0).contains(&b) || k1 < 0.0 {
            return Err(SetupError::model_load(format!(
                "invalid BM25 parameters (b = {b}, k1 = {k1})"
            )));
        }
        Ok(Self {
            b,
            k1,
            tokenizer: Bm25Tokenizer::new(options)?,
            stats: None,
        })
    }

    /// Learn document frequencies and average length from `corpus`.
    /// Documents without any surviving token are skipped.
    pub fn fit(&mut self, corpus: &[&str]) -> Result<&mut Self, SetupError> {
        let mut doc_freq: HashMap<u32, f64> = HashMap::new();
        let mut n_docs = 0u64;
        let mut sum_doc_len = 0.0;

        for doc in corpus {
            let (indices, tf) = self.term_frequencies(doc)?;
            if indices.is_empty() {
                continue;
            }
            n_docs += 1;
            sum_doc_len += tf.iter().sum::<f64>();
            for index in indices {
                *doc_freq.entry(index).or_insert(0.0) += 1.0;
            }
        }

        if n_docs == 0 {
            return Err(SetupError::encoding(
                "cannot fit BM25 on a corpus without any indexable tokens",
            ));
        }

        let avgdl = sum_doc_len / n_docs as f64;
        debug!(
            target: "pinecone_bootstrap::bm25",
            n_docs,
            terms = doc_freq.len(),
            avgdl,
            "bm25 fitted"
        );
        self.stats = Some(CorpusStats {
            doc_freq,
            n_docs,
            avgdl,
        });
        Ok(self)
    }

    pub fn encode_document(&self, text: &str) -> Result<SparseVector, SetupError> {
        let stats = self.fitted()?;
        let (indices, tf) = self.term_frequencies(text)?;
        let tf_sum: f64 = tf.iter().sum();
        let norm = self.k1 * (1.0 - self.b + self.b * (tf_sum / stats.avgdl));
        let values = tf.iter().map(|t| (t / (norm + t)) as f32).collect();
        SparseVector::new(indices, values)
    }

    pub fn encode_query(&self, text: &str) -> Result<SparseVector, SetupError> {
        let stats = self.fitted()?;
        let (indices, _) = self.term_frequencies(text)?;
        let n_docs = stats.n_docs as f64;
        let idf: Vec<f64> = indices
            .iter()
            .map(|index| {
                let df = stats.doc_freq.get(index).copied().unwrap_or(1.0);
                ((n_docs + 1.0) / (df + 0.5)).ln()
            })
            .collect();
        let total: f64 = idf.iter().sum();
        if total <= 0.0 {
            return Ok(SparseVector::default());
        }
        let values = idf.iter().map(|v| (v / total) as f32).collect();
        SparseVector::new(indices, values)
    }

    pub fn params(&self) -> Result<Bm25Params, SetupError> {
        let stats = self.fitted()?;
        let mut entries: Vec<(u32, f64)> =
            stats.doc_freq.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_unstable_by_key(|(index, _)| *index);
        let options = self.tokenizer.options();
        Ok(Bm25Params {
            avgdl: stats.avgdl,
            n_docs: stats.n_docs,
            doc_freq: DocFreq {
                indices: entries.iter().map(|(index, _)| *index).collect(),
                values: entries.iter().map(|(_, value)| *value).collect(),
            },
            b: self.b,
            k1: self.k1,
            lower_case: options.lower_case,
            remove_punctuation: options.remove_punctuation,
            remove_stopwords: options.remove_stopwords,
            stem: options.stem,
            language: options.language.clone(),
        })
    }

    pub fn from_params(params: Bm25Params) -> Result<Self, SetupError> {
        if params.doc_freq.indices.len() != params.doc_freq.values.len() {
            return Err(SetupError::model_load(
                "BM25 doc_freq indices and values differ in length",
            ));
        }
        if params.n_docs == 0 || params.avgdl <= 0.0 {
            return Err(SetupError::model_load(
                "BM25 parameters describe an empty corpus",
            ));
        }

        let mut encoder = Self::with_options(
            params.b,
            params.k1,
            TokenizerOptions {
                lower_case: params.lower_case,
                remove_punctuation: params.remove_punctuation,
                remove_stopwords: params.remove_stopwords,
                stem: params.stem,
                language: params.language,
            },
        )?;
        encoder.stats = Some(CorpusStats {
            doc_freq: params
                .doc_freq
                .indices
                .into_iter()
                .zip(params.doc_freq.values)
                .collect(),
            n_docs: params.n_docs,
            avgdl: params.avgdl,
        });
        Ok(encoder)
    }

    pub fn dump(&self, path: impl AsRef<Path>) -> Result<(), SetupError> {
        let path = path.as_ref();
        let payload = serde_json::to_vec(&self.params()?)
            .map_err(|err| SetupError::encoding(format!("failed to encode BM25 params: {err}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, payload)?;
        info!(
            target: "pinecone_bootstrap::bm25",
            path = %path.display(),
            "bm25 params written"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| {
            SetupError::model_load(format!(
                "failed to read BM25 params {}: {err}",
                path.display()
            ))
        })?;
        let params: Bm25Params = serde_json::from_slice(&bytes).map_err(|err| {
            SetupError::model_load(format!(
                "invalid BM25 params {}: {err}",
                path.display()
            ))
        })?;
        Self::from_params(params)
    }

    fn fitted(&self) -> Result<&CorpusStats, SetupError> {
        self.stats.as_ref().ok_or_else(|| {
            SetupError::encoding("BM25 must be fitted before encoding (call fit or load params)")
        })
    }

    /// Unique token indices in first-seen order, with their counts.
    fn term_frequencies(&self, text: &str) -> Result<(Vec<u32>, Vec<f64>), SetupError> {
        let mut indices = Vec::new();
        let mut counts: Vec<f64> = Vec::new();
        let mut positions: HashMap<u32, usize> = HashMap::new();

        for token in self.tokenizer.tokenize(text) {
            let index = hash_token(&token)?;
            match positions.get(&index) {
                Some(pos) => counts[*pos] += 1.0,
                None => {
                    positions.insert(index, indices.len());
                    indices.push(index);
                    counts.push(1.0);
                }
            }
        }

        Ok((indices, counts))
    }
}

/// Unsigned 32-bit MurmurHash3 of the token's UTF-8 bytes, seed 0.
pub fn hash_token(token: &str) -> Result<u32, SetupError> {
    murmur3::murmur3_32(&mut Cursor::new(token.as_bytes()), 0)
        .map_err(|err| SetupError::encoding(format!("failed to hash token `{token}`: {err}")))
}

impl SparseEncoder for Bm25Encoder {
    fn encode_documents(&self, texts: &[&str]) -> Result<Vec<SparseVector>, SetupError> {
        texts.iter().map(|text| self.encode_document(text)).collect()
    }

    fn encode_queries(&self, texts: &[&str]) -> Result<Vec<SparseVector>, SetupError> {
        texts.iter().map(|text| self.encode_query(text)).collect()
    }

    fn is_fitted(&self) -> bool {
        self.stats.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &[&str] = &["The cat sat", "the dog barked", "cat and dog"];

    fn fitted() -> Bm25Encoder {
        let mut encoder = Bm25Encoder::new().unwrap();
        encoder.fit(CORPUS).unwrap();
        encoder
    }

    fn idx(token: &str) -> u32 {
        hash_token(token).unwrap()
    }

    #[test]
    fn hashes_match_unsigned_murmur3() {
        assert_eq!(hash_token("hello").unwrap(), 613_153_351);
    }

    #[test]
    fn unfitted_encoder_refuses_to_encode() {
        let encoder = Bm25Encoder::new().unwrap();
        assert!(!encoder.is_fitted());
        let err = encoder.encode_queries(&["cat"]).unwrap_err();
        assert!(matches!(err, SetupError::Encoding(_)));
        assert!(encoder.dump("unused.json").is_err());
    }

    #[test]
    fn fit_on_empty_corpus_is_an_error() {
        let mut encoder = Bm25Encoder::new().unwrap();
        assert!(encoder.fit(&["the", "!!!"]).is_err());
        assert!(!encoder.is_fitted());
    }

    #[test]
    fn document_weights_follow_bm25_saturation() {
        let encoder = fitted();
        let vector = encoder.encode_document("cat cat dog").unwrap();

        assert_eq!(vector.indices, vec![idx("cat"), idx("dog")]);
        // avgdl = 2, tf_sum = 3 -> norm = 1.2 * (0.25 + 0.75 * 1.5) = 1.65
        let cat = vector.get(idx("cat")).unwrap();
        let dog = vector.get(idx("dog")).unwrap();
        assert!((cat - 2.0 / 3.65).abs() < 1e-6);
        assert!((dog - 1.0 / 2.65).abs() < 1e-6);
    }

    #[test]
    fn quotes_and_ellipses_match_pinecone_text_vectors() {
        let mut encoder = Bm25Encoder::new().unwrap();
        encoder.fit(&["\"Hello\" wait...", "wait for it"]).unwrap();

        // pinecone-text: tokens ``, hello, '', wait, ... with avgdl 3.
        let doc = encoder.encode_document("\"Hello\" wait...").unwrap();
        assert_eq!(
            doc.indices,
            vec![1_558_403_699, 613_153_351, 4_240_885_550, 4_191_199_403, 436_757_074]
        );
        for value in &doc.values {
            assert!((value - 0.357_142_86).abs() < 1e-6);
        }

        let query = encoder.encode_query("wait hello").unwrap();
        assert_eq!(query.indices, vec![4_191_199_403, 613_153_351]);
        assert!((query.values[0] - 0.208_255_93).abs() < 1e-6);
        assert!((query.values[1] - 0.791_744_07).abs() < 1e-6);
    }

    #[test]
    fn query_weights_are_normalised_idf() {
        let encoder = fitted();

        let single = encoder.encode_query("cat").unwrap();
        assert_eq!(single.values, vec![1.0]);

        let mixed = encoder.encode_query("cat unicorn").unwrap();
        let sum: f32 = mixed.values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        // Rare (unseen) terms weigh more than common ones.
        assert!(mixed.get(idx("unicorn")).unwrap() > mixed.get(idx("cat")).unwrap());
    }

    #[test]
    fn stop_word_only_query_is_empty() {
        let encoder = fitted();
        assert!(encoder.encode_query("the and of").unwrap().is_empty());
    }

    #[test]
    fn params_use_pinecone_text_layout() {
        let params = serde_json::to_value(fitted().params().unwrap()).unwrap();
        for key in [
            "avgdl",
            "n_docs",
            "doc_freq",
            "b",
            "k1",
            "lower_case",
            "remove_punctuation",
            "remove_stopwords",
            "stem",
            "language",
        ] {
            assert!(params.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(params["n_docs"], 3);
        assert_eq!(params["language"], "english");
    }

    #[test]
    fn dumped_params_reload_with_same_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm25").join("params.json");
        let encoder = fitted();
        encoder.dump(&path).unwrap();

        let reloaded = Bm25Encoder::load(&path).unwrap();
        assert!(reloaded.is_fitted());
        assert_eq!(
            reloaded.encode_query("cat unicorn").unwrap(),
            encoder.encode_query("cat unicorn").unwrap()
        );
    }

    #[test]
    fn loads_params_written_with_integer_frequencies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let payload = serde_json::json!({
            "avgdl": 2.0,
            "n_docs": 3,
            "doc_freq": { "indices": [idx("cat"), idx("dog")], "values": [2, 2] },
            "b": 0.75,
            "k1": 1.2,
            "lower_case": true,
            "remove_punctuation": true,
            "remove_stopwords": true,
            "stem": true,
            "language": "english"
        });
        fs::write(&path, payload.to_string()).unwrap();

        let encoder = Bm25Encoder::load(&path).unwrap();
        let vector = encoder.encode_query("dog").unwrap();
        assert_eq!(vector.indices, vec![idx("dog")]);
    }

    #[test]
    fn malformed_params_are_model_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, "{\"avgdl\": 1.0}").unwrap();
        assert!(matches!(
            Bm25Encoder::load(&path),
            Err(SetupError::ModelLoad(_))
        ));
    }
}
