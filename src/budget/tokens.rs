//! Token estimation with a bounded cache of tokenizer handles.

use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use lru::LruCache;
use tiktoken_rs::CoreBPE;
use tiktoken_rs::tokenizer::get_tokenizer;
use tracing::{debug, warn};

use super::profile::profile_for;

/// Number of tokenizer handles kept alive at once.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Characters per token used only when no tokenizer can be built at all.
const HEURISTIC_CHARS_PER_TOKEN: usize = 4;

/// Shared estimator backing [`estimate_tokens`].
static ESTIMATOR: LazyLock<TokenEstimator> = LazyLock::new(TokenEstimator::default);

/// Estimate the token count of `text` for a model/provider pair.
///
/// Uses the process-wide estimator, so tokenizer handles are built once per
/// model and reused across calls.
pub fn estimate_tokens(text: &str, model_name: &str, provider: &str) -> usize {
    ESTIMATOR.count(text, model_name, provider)
}

/// Counts tokens using tiktoken encodings.
///
/// Building a BPE handle parses a large rank table, so handles are kept in an
/// LRU cache keyed by the tokenizer model they were built for. The cache sits
/// behind a mutex and the estimator can be shared across threads.
pub struct TokenEstimator {
    cache: Mutex<LruCache<String, Arc<CoreBPE>>>,
}

impl TokenEstimator {
    /// Create an estimator holding at most `capacity` tokenizer handles.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Count tokens in `text`.
    ///
    /// Empty text is zero tokens. Never fails: unknown models use the
    /// provider's approximation model, and if no tokenizer can be built the
    /// count falls back to a characters-per-token heuristic.
    pub fn count(&self, text: &str, model_name: &str, provider: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        match self.handle(&tokenizer_model(model_name, provider)) {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => text.chars().count().div_ceil(HEURISTIC_CHARS_PER_TOKEN),
        }
    }

    /// Number of tokenizer handles currently cached.
    pub fn cached_tokenizers(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn handle(&self, model: &str) -> Option<Arc<CoreBPE>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bpe) = cache.get(model) {
            return Some(Arc::clone(bpe));
        }

        debug!(model, "Building tokenizer (cache miss)");
        let bpe = Arc::new(build_bpe(model)?);
        cache.put(model.to_string(), Arc::clone(&bpe));
        Some(bpe)
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Pick the model whose tokenizer will be used for counting.
///
/// Models tiktoken knows are used as-is; anything else (local models,
/// Gemini, OpenRouter slugs) maps to the provider profile's stand-in.
pub fn tokenizer_model(model_name: &str, provider: &str) -> String {
    let model = model_name.trim();
    if get_tokenizer(model).is_some() {
        model.to_string()
    } else {
        profile_for(provider).tokenizer_model.to_string()
    }
}

fn build_bpe(model: &str) -> Option<CoreBPE> {
    let built = match get_tokenizer(model) {
        Some(tokenizer) => tiktoken_rs::get_bpe_from_tokenizer(tokenizer),
        None => tiktoken_rs::cl100k_base(),
    };

    match built {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            warn!("Failed to build tokenizer for '{}': {}, trying cl100k_base", model, e);
            match tiktoken_rs::cl100k_base() {
                Ok(bpe) => Some(bpe),
                Err(e) => {
                    warn!("cl100k_base unavailable ({}), using character heuristic", e);
                    None
                }
            }
        }
    }
}
