//! Full-text tokenization built on Tantivy analyzers.
//!
//! Pipeline: `SimpleTokenizer` -> `RemoveLongFilter` -> `LowerCaser` ->
//! `StopWordFilter`, with a second analyzer that appends a `Stemmer` for the
//! document language. Both analyzers drop the same tokens, so their outputs
//! line up one-to-one.

use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter,
    TextAnalyzer, TokenStream,
};

/// Stop words used when a schema does not provide its own list.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "is", "the", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in",
    "into", "it", "no", "not", "of", "on", "or", "such", "that", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Tokens longer than this are dropped.
const MAX_TOKEN_LEN: usize = 64;

/// Per-field tokenization switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizeOptions {
    pub no_stem: bool,
    /// Carried for phonetic matchers; no phonetic terms are produced here.
    pub phonetic: bool,
}

/// One token emitted by [`Tokenizer::tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Normalized term
    pub term: &'a str,
    /// Stemmed form, when stemming applies and differs from `term`
    pub stem: Option<&'a str>,
    /// 1-based position among the tokens of this call
    pub pos: u32,
    /// Byte offset of the token in the input text
    pub byte_offset: u32,
}

/// Map a language name to a Tantivy stemming language.
pub fn parse_language(name: &str) -> Option<Language> {
    let lang = match name.to_ascii_lowercase().as_str() {
        "arabic" => Language::Arabic,
        "danish" => Language::Danish,
        "dutch" => Language::Dutch,
        "english" => Language::English,
        "finnish" => Language::Finnish,
        "french" => Language::French,
        "german" => Language::German,
        "greek" => Language::Greek,
        "hungarian" => Language::Hungarian,
        "italian" => Language::Italian,
        "norwegian" => Language::Norwegian,
        "portuguese" => Language::Portuguese,
        "romanian" => Language::Romanian,
        "russian" => Language::Russian,
        "spanish" => Language::Spanish,
        "swedish" => Language::Swedish,
        "tamil" => Language::Tamil,
        "turkish" => Language::Turkish,
        _ => return None,
    };
    Some(lang)
}

/// Tokenizer bound to one language and stop-word list.
#[derive(Clone)]
pub struct Tokenizer {
    base: TextAnalyzer,
    stemming: Option<TextAnalyzer>,
    // Scratch buffers reused across calls
    terms: Vec<(String, u32)>,
    stems: Vec<String>,
}

impl Tokenizer {
    /// Build a tokenizer.
    ///
    /// `language` defaults to English; an unknown language disables stemming.
    /// `stopwords` defaults to [`DEFAULT_STOPWORDS`].
    pub fn new(language: Option<&str>, stopwords: Option<&[String]>) -> Self {
        let words: Vec<String> = match stopwords {
            Some(list) => list.iter().map(|w| w.to_lowercase()).collect(),
            None => DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect(),
        };

        let base = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(words.clone()))
            .build();

        let stemming = parse_language(language.unwrap_or("english")).map(|lang| {
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .filter(StopWordFilter::remove(words))
                .filter(Stemmer::new(lang))
                .build()
        });

        Self {
            base,
            stemming,
            terms: Vec::new(),
            stems: Vec::new(),
        }
    }

    pub fn stems(&self) -> bool {
        self.stemming.is_some()
    }

    /// Tokenize `text`, calling `sink` once per token in order.
    ///
    /// Returns the number of tokens emitted.
    pub fn tokenize<F>(&mut self, text: &str, options: TokenizeOptions, mut sink: F) -> u32
    where
        F: FnMut(Token<'_>),
    {
        self.terms.clear();
        self.stems.clear();

        let mut stream = self.base.token_stream(text);
        while stream.advance() {
            let tok = stream.token();
            self.terms.push((tok.text.clone(), tok.offset_from as u32));
        }

        let stemming = match (&mut self.stemming, options.no_stem) {
            (Some(analyzer), false) => {
                let mut stream = analyzer.token_stream(text);
                while stream.advance() {
                    self.stems.push(stream.token().text.clone());
                }
                self.stems.len() == self.terms.len()
            }
            _ => false,
        };

        for (i, (term, offset)) in self.terms.iter().enumerate() {
            let stem = if stemming {
                self.stems
                    .get(i)
                    .map(String::as_str)
                    .filter(|s| *s != term.as_str())
            } else {
                None
            };
            sink(Token {
                term,
                stem,
                pos: i as u32 + 1,
                byte_offset: *offset,
            });
        }

        self.terms.len() as u32
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("stems", &self.stems())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(tok: &mut Tokenizer, text: &str, options: TokenizeOptions) -> Vec<(String, Option<String>, u32, u32)> {
        let mut out = Vec::new();
        tok.tokenize(text, options, |t| {
            out.push((
                t.term.to_string(),
                t.stem.map(str::to_string),
                t.pos,
                t.byte_offset,
            ))
        });
        out
    }

    #[test]
    fn test_lowercases_and_drops_stopwords() {
        let mut tok = Tokenizer::new(None, None);
        let out = collect(&mut tok, "The Quick fox", TokenizeOptions::default());
        let terms: Vec<_> = out.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(terms, vec!["quick", "fox"]);
        assert_eq!(out[0].2, 1);
        assert_eq!(out[1].2, 2);
        assert_eq!(out[0].3, 4);
        assert_eq!(out[1].3, 10);
    }

    #[test]
    fn test_stems_when_different() {
        let mut tok = Tokenizer::new(Some("english"), None);
        let out = collect(&mut tok, "running fox", TokenizeOptions::default());
        assert_eq!(out[0].0, "running");
        assert_eq!(out[0].1.as_deref(), Some("run"));
        assert_eq!(out[1].1, None);
    }

    #[test]
    fn test_no_stem_option() {
        let mut tok = Tokenizer::new(None, None);
        let options = TokenizeOptions {
            no_stem: true,
            ..Default::default()
        };
        let out = collect(&mut tok, "running", options);
        assert_eq!(out[0].1, None);
    }

    #[test]
    fn test_unknown_language_disables_stemming() {
        let mut tok = Tokenizer::new(Some("klingon"), None);
        assert!(!tok.stems());
        let out = collect(&mut tok, "running", TokenizeOptions::default());
        assert_eq!(out[0].1, None);
    }

    #[test]
    fn test_custom_stopwords() {
        let words = vec!["Quick".to_string()];
        let mut tok = Tokenizer::new(None, Some(&words));
        let out = collect(&mut tok, "the quick fox", TokenizeOptions::default());
        let terms: Vec<_> = out.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(terms, vec!["the", "fox"]);
    }

    #[test]
    fn test_parse_language() {
        assert_eq!(parse_language("French"), Some(Language::French));
        assert_eq!(parse_language("esperanto"), None);
    }
}
