//! Token encoding
//!
//! Prompts are budgeted in tokens, and webpages are chunked by tokens, so an
//! agent run holds an encoder for its whole lifetime. Encoders are acquired
//! from an [`EncodingProvider`] and handed back when the [`EncodingGuard`]
//! drops, which makes the release happen on every exit path of a run.

use crate::error::{AgentError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use tiktoken_rs::CoreBPE;

/// Token id produced by an encoding
pub type Token = u32;

/// A text tokenizer
pub trait TokenEncoding: Send + Sync {
    /// Split text into tokens
    fn encode(&self, text: &str) -> Vec<Token>;

    /// Turn tokens back into text
    fn decode(&self, tokens: &[Token]) -> String;

    /// Number of tokens in text
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }

    /// Keep at most `max_tokens` tokens of text
    fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let tokens = self.encode(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }
        self.decode(&tokens[..max_tokens])
    }
}

/// Hands out encoders scoped to a single run
pub trait EncodingProvider: Send + Sync {
    /// Acquire an encoder for the given model
    fn acquire(&self, model: &str) -> Result<EncodingGuard>;
}

/// An acquired encoder, released when dropped
pub struct EncodingGuard {
    encoding: Arc<dyn TokenEncoding>,
    live: Arc<AtomicUsize>,
    model: String,
}

impl EncodingGuard {
    /// Wrap an encoder, counting it as live until the guard drops
    pub fn new(encoding: Arc<dyn TokenEncoding>, live: Arc<AtomicUsize>, model: &str) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            encoding,
            live,
            model: model.to_string(),
        }
    }

    /// Model the encoder was acquired for
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Deref for EncodingGuard {
    type Target = dyn TokenEncoding;

    fn deref(&self) -> &Self::Target {
        self.encoding.as_ref()
    }
}

impl Drop for EncodingGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("released token encoding for {}", self.model);
    }
}

impl fmt::Debug for EncodingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingGuard")
            .field("model", &self.model)
            .finish()
    }
}

static PIECE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]|\s+").unwrap());

/// Lexical encoder splitting text into word, punctuation and whitespace pieces
///
/// Token ids index into a vocabulary the encoder grows as it sees new
/// pieces, so decoding is lossless for anything it has encoded.
#[derive(Default)]
pub struct LexicalEncoding {
    vocab: std::sync::Mutex<Vocabulary>,
}

#[derive(Default)]
struct Vocabulary {
    ids: std::collections::HashMap<String, Token>,
    pieces: Vec<String>,
}

impl LexicalEncoding {
    /// Create an empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Split text into its pieces without assigning ids
    pub fn pieces(text: &str) -> impl Iterator<Item = &str> {
        PIECE_PATTERN.find_iter(text).map(|m| m.as_str())
    }
}

impl TokenEncoding for LexicalEncoding {
    fn encode(&self, text: &str) -> Vec<Token> {
        let mut vocab = match self.vocab.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Self::pieces(text)
            .map(|piece| {
                if let Some(id) = vocab.ids.get(piece) {
                    return *id;
                }
                let id = vocab.pieces.len() as Token;
                vocab.pieces.push(piece.to_string());
                vocab.ids.insert(piece.to_string(), id);
                id
            })
            .collect()
    }

    fn decode(&self, tokens: &[Token]) -> String {
        let vocab = match self.vocab.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tokens
            .iter()
            .filter_map(|id| vocab.pieces.get(*id as usize))
            .map(String::as_str)
            .collect()
    }

    fn count(&self, text: &str) -> usize {
        Self::pieces(text).count()
    }
}

/// Provider handing out a fresh [`LexicalEncoding`] per run
#[derive(Default, Clone)]
pub struct LexicalEncodingProvider {
    live: Arc<AtomicUsize>,
}

impl LexicalEncodingProvider {
    /// Create a provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of encoders acquired and not yet released
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl EncodingProvider for LexicalEncodingProvider {
    fn acquire(&self, model: &str) -> Result<EncodingGuard> {
        if model.trim().is_empty() {
            return Err(AgentError::EncodingUnavailable {
                model: model.to_string(),
            }
            .into());
        }
        Ok(EncodingGuard::new(
            Arc::new(LexicalEncoding::new()),
            self.live.clone(),
            model,
        ))
    }
}

/// Byte pair encoding used by the OpenAI models
pub struct TiktokenEncoding {
    bpe: CoreBPE,
}

impl TiktokenEncoding {
    /// Encoding of `model`, `cl100k_base` for models tiktoken does not know
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(_) => {
                tracing::debug!("No tiktoken encoding for {}, using cl100k_base", model);
                tiktoken_rs::cl100k_base().map_err(|_| AgentError::EncodingUnavailable {
                    model: model.to_string(),
                })?
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenEncoding for TiktokenEncoding {
    fn encode(&self, text: &str) -> Vec<Token> {
        self.bpe.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[Token]) -> String {
        // A cut can split a multi-byte character; back off until it decodes
        let mut end = tokens.len();
        loop {
            if let Ok(text) = self.bpe.decode(tokens[..end].to_vec()) {
                return text;
            }
            if end == 0 || tokens.len() - end >= 4 {
                return String::new();
            }
            end -= 1;
        }
    }
}

/// Provider handing out tiktoken encodings, loaded once per model
#[derive(Default, Clone)]
pub struct TiktokenEncodingProvider {
    loaded: Arc<Mutex<HashMap<String, Arc<TiktokenEncoding>>>>,
    live: Arc<AtomicUsize>,
}

impl TiktokenEncodingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of encoders acquired and not yet released
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl EncodingProvider for TiktokenEncodingProvider {
    fn acquire(&self, model: &str) -> Result<EncodingGuard> {
        if model.trim().is_empty() {
            return Err(AgentError::EncodingUnavailable {
                model: model.to_string(),
            }
            .into());
        }
        let mut loaded = match self.loaded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let encoding = match loaded.get(model) {
            Some(encoding) => encoding.clone(),
            None => {
                let encoding = Arc::new(TiktokenEncoding::for_model(model)?);
                loaded.insert(model.to_string(), encoding.clone());
                encoding
            }
        };
        Ok(EncodingGuard::new(encoding, self.live.clone(), model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_roundtrip_is_lossless() {
        let encoding = LexicalEncoding::new();
        let text = "Hello, world!\n\n  It's 42 degrees.";
        let tokens = encoding.encode(text);
        assert_eq!(encoding.decode(&tokens), text);
        assert_eq!(encoding.count(text), tokens.len());
    }

    #[test]
    fn test_truncate_keeps_prefix() {
        let encoding = LexicalEncoding::new();
        assert_eq!(encoding.truncate("one two three", 3), "one two");
        assert_eq!(encoding.truncate("one", 10), "one");
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let provider = LexicalEncodingProvider::new();
        {
            let guard = provider.acquire("gpt-3.5-turbo").unwrap();
            assert_eq!(guard.model(), "gpt-3.5-turbo");
            assert_eq!(guard.count("a b"), 3);
            assert_eq!(provider.live_count(), 1);
        }
        assert_eq!(provider.live_count(), 0);
    }

    #[test]
    fn test_acquire_rejects_empty_model() {
        let provider = LexicalEncodingProvider::new();
        assert!(provider.acquire("").is_err());
        assert_eq!(provider.live_count(), 0);
    }

    #[test]
    fn test_tiktoken_counts_model_tokens() {
        let provider = TiktokenEncodingProvider::new();
        let guard = provider.acquire("gpt-3.5-turbo").unwrap();
        assert_eq!(guard.count("hello world"), 2);
        assert_eq!(guard.truncate("hello world, again", 2), "hello world");
        assert_eq!(provider.live_count(), 1);
        drop(guard);
        assert_eq!(provider.live_count(), 0);
    }

    #[test]
    fn test_tiktoken_unknown_model_falls_back() {
        let provider = TiktokenEncodingProvider::new();
        let guard = provider.acquire("my-local-model").unwrap();
        let text = "Tokyo weather: 東京の天気";
        assert_eq!(guard.decode(&guard.encode(text)), text);
        assert!(provider.acquire(" ").is_err());
    }
}
