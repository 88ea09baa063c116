//! Word tokenizer feeding the BM25 encoder.

use std::collections::HashSet;

use rust_stemmers::{Algorithm, Stemmer};

use crate::domain::SetupError;

/// NLTK's English stop-word list.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Clitics split off the end of a word, longest first.
const CLITICS: &[&str] = &["n't", "'ll", "'re", "'ve", "'s", "'m", "'d"];

/// Flags controlling normalisation, mirrored in the dumped BM25 parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerOptions {
    pub lower_case: bool,
    pub remove_punctuation: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub language: String,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            lower_case: true,
            remove_punctuation: true,
            remove_stopwords: true,
            stem: true,
            language: "english".to_string(),
        }
    }
}

pub struct Bm25Tokenizer {
    options: TokenizerOptions,
    stemmer: Option<Stemmer>,
    stop_words: HashSet<&'static str>,
}

impl Bm25Tokenizer {
    pub fn new(options: TokenizerOptions) -> Result<Self, SetupError> {
        if !options.language.eq_ignore_ascii_case("english") {
            return Err(SetupError::model_load(format!(
                "unsupported BM25 language `{}` (only english is available)",
                options.language
            )));
        }

        let stemmer = options.stem.then(|| Stemmer::create(Algorithm::English));
        let stop_words = if options.remove_stopwords {
            ENGLISH_STOP_WORDS.iter().copied().collect()
        } else {
            HashSet::new()
        };

        Ok(Self {
            options,
            stemmer,
            stop_words,
        })
    }

    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        word_tokens(text)
            .into_iter()
            .map(|token| {
                if self.options.lower_case {
                    token.to_lowercase()
                } else {
                    token
                }
            })
            .filter(|token| !(self.options.remove_punctuation && is_punctuation(token)))
            .filter(|token| !self.stop_words.contains(token.to_lowercase().as_str()))
            .map(|token| match &self.stemmer {
                Some(stemmer) => stemmer.stem(&token).into_owned(),
                None => token,
            })
            .filter(|token| !token.is_empty())
            .collect()
    }
}

/// Python's `string.punctuation`.
const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// A token is dropped as punctuation only when it is a contiguous run of
/// `PUNCTUATION`; multi-character tokens such as `...`, `` `` `` and `''`
/// survive and are hashed like words.
fn is_punctuation(token: &str) -> bool {
    !token.is_empty() && PUNCTUATION.contains(token)
}

/// Treebank-style word split: whitespace first, leading/trailing punctuation
/// peeled into its own tokens, `...` and `--` kept whole, double quotes
/// rewritten to `` `` `` (opening) and `''` (closing), and English clitics
/// split (`don't` -> `do`, `n't`).
fn word_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let spaced = text.replace("...", " ... ");

    for chunk in spaced.split_whitespace() {
        let start = chunk
            .find(|c: char| !c.is_ascii_punctuation())
            .unwrap_or(chunk.len());
        let end = chunk
            .rfind(|c: char| !c.is_ascii_punctuation())
            .map(|idx| idx + chunk[idx..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(start);

        push_punctuation(&chunk[..start], "``", &mut tokens);
        if start < end {
            split_clitic(&chunk[start..end], &mut tokens);
        }
        push_punctuation(&chunk[end.max(start)..], "''", &mut tokens);
    }

    tokens
}

/// Emit a run of ASCII punctuation, with `"` rewritten to `quote`.
fn push_punctuation(mut run: &str, quote: &str, tokens: &mut Vec<String>) {
    while let Some(c) = run.chars().next() {
        let (token, len) = if run.starts_with("...") {
            ("...".to_string(), 3)
        } else if run.starts_with("--") {
            ("--".to_string(), 2)
        } else if c == '"' {
            (quote.to_string(), 1)
        } else {
            (c.to_string(), c.len_utf8())
        };
        tokens.push(token);
        run = &run[len..];
    }
}

fn split_clitic(word: &str, tokens: &mut Vec<String>) {
    let lowered = word.to_lowercase();
    for clitic in CLITICS {
        if lowered.len() > clitic.len() && lowered.ends_with(clitic) {
            let cut = word.len() - clitic.len();
            if word.is_char_boundary(cut) {
                tokens.push(word[..cut].to_string());
                tokens.push(word[cut..].to_string());
                return;
            }
        }
    }
    tokens.push(word.to_string());
}
