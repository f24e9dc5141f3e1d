//! Token estimation for prompts and completions.
//!
//! [`estimate_tokens_approx`] is a rough proxy (about four characters per
//! token) and must not be used for billing. [`BpeTokenEstimator`] gives exact
//! counts for `cl100k_base` models and can replace it behind the same
//! [`TokenEstimator`] trait.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

use crate::errors::{Result, StatsError};

const CHARS_PER_TOKEN: usize = 4;

/// `ceil(len / 4)`, where `len` is measured in UTF-16 code units.
pub fn estimate_tokens_approx(text: &str) -> usize {
    text.encode_utf16().count().div_ceil(CHARS_PER_TOKEN)
}

pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;

    fn name(&self) -> &'static str;

    fn usage(&self, prompt: &str, completion: &str) -> TokenUsage {
        let prompt_tokens = self.estimate(prompt);
        let completion_tokens = self.estimate(completion);
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenEstimator;

impl TokenEstimator for ApproxTokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        estimate_tokens_approx(text)
    }

    fn name(&self) -> &'static str {
        "approx"
    }
}

static CL100K: OnceLock<CoreBPE> = OnceLock::new();

/// Exact token counts using the `cl100k_base` encoding.
#[derive(Clone, Copy)]
pub struct BpeTokenEstimator {
    bpe: &'static CoreBPE,
}

impl BpeTokenEstimator {
    /// Loads the encoding tables on first use; later calls share them.
    pub fn cl100k() -> Result<Self> {
        if let Some(bpe) = CL100K.get() {
            return Ok(Self { bpe });
        }
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| StatsError::Tokenizer(e.to_string()))?;
        log::debug!("loaded cl100k_base encoding");
        Ok(Self {
            bpe: CL100K.get_or_init(|| bpe),
        })
    }
}

impl TokenEstimator for BpeTokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn name(&self) -> &'static str {
        "cl100k"
    }
}

/// Which estimator to construct, as named in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenEstimatorKind {
    #[default]
    Approx,
    Cl100k,
}

impl TokenEstimatorKind {
    pub fn build(self) -> Result<Box<dyn TokenEstimator>> {
        match self {
            TokenEstimatorKind::Approx => Ok(Box::new(ApproxTokenEstimator)),
            TokenEstimatorKind::Cl100k => Ok(Box::new(BpeTokenEstimator::cl100k()?)),
        }
    }
}

/// Token counts for one prompt/completion exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}
