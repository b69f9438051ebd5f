// Copyright 2019-present, the HuggingFace Inc. team, The Google AI Language Team and Facebook, Inc.
// Copyright 2019-2020 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Tokenization blocks shared by the QuAC pipelines
//! The feature extraction and post-processing steps only rely on the `QaTokenizer` capability:
//! sub-word tokenization, id conversions, detokenization, special tokens and a small descriptor of
//! the tokenizer conventions (`TokenizerCapabilities`). `QuacTokenizer` provides this capability for
//! the `rust_tokenizers` Bert, Roberta and XLNet tokenizers.
use crate::common::error::QuacError;
use rust_tokenizers::tokenizer::{BertTokenizer, RobertaTokenizer, Tokenizer, XLNetTokenizer};
use rust_tokenizers::vocab::Vocab;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
/// # Identifies the type of model the tokenizer belongs to
pub enum ModelType {
    Bert,
    Roberta,
    XLNet,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
/// # Side on which the sequences get padded
pub enum PaddingSide {
    /// `[CLS] question [SEP] context [SEP] [PAD]...`
    Right,
    /// `[PAD]... context [SEP] question [SEP] [CLS]`
    Left,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
/// # Conventions of a tokenizer relevant to the construction of question/context pairs
pub struct TokenizerCapabilities {
    /// Words are tokenized as if preceded by a space (byte-level BPE tokenizers)
    pub adds_prefix_space: bool,
    /// Two separator tokens are placed between the question and the context
    pub uses_double_separator: bool,
    /// Padding side of the encoded inputs
    pub padding_side: PaddingSide,
}

impl TokenizerCapabilities {
    /// Number of separators between the two segments of a pair
    pub fn separators_between(&self) -> usize {
        if self.uses_double_separator {
            2
        } else {
            1
        }
    }

    /// Total number of special tokens added to a sequence pair
    pub fn pair_special_tokens(&self) -> usize {
        // classification token, separator(s) between segments and the closing separator
        1 + self.separators_between() + 1
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// # Special tokens (string and vocabulary id) used to build model inputs
pub struct SpecialTokens {
    pub cls_token: String,
    pub cls_token_id: i64,
    pub sep_token: String,
    pub sep_token_id: i64,
    pub pad_token: String,
    pub pad_token_id: i64,
}

/// # Sub-word tokenizer capability consumed by the QuAC pipelines
///
/// Implementations must be shareable across the feature conversion worker threads.
pub trait QaTokenizer: Send + Sync {
    /// Splits a text into sub-word tokens.
    ///
    /// Context words are tokenized one at a time: when `capabilities().adds_prefix_space` is set,
    /// every call must tokenize its input as if it were preceded by a space, so that a word gets
    /// the same sub-tokens in isolation as in running text.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Converts sub-word tokens to their vocabulary ids
    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<i64>;

    /// Converts vocabulary ids back to sub-word tokens
    fn convert_ids_to_tokens(&self, ids: &[i64]) -> Vec<String>;

    /// Joins sub-word tokens back into a string (e.g. merging `##` continuation pieces)
    fn convert_tokens_to_string(&self, tokens: &[String]) -> String;

    /// Special tokens of the tokenizer
    fn special_tokens(&self) -> &SpecialTokens;

    /// Conventions used to build question/context pairs
    fn capabilities(&self) -> TokenizerCapabilities;
}

/// # Abstraction that holds a particular `rust_tokenizers` tokenizer
pub enum TokenizerOption {
    /// Bert Tokenizer
    Bert(BertTokenizer),
    /// Roberta Tokenizer
    Roberta(RobertaTokenizer),
    /// XLNet Tokenizer
    XLNet(XLNetTokenizer),
}

impl TokenizerOption {
    /// Interface method to load a tokenizer from file
    pub fn from_file(
        model_type: ModelType,
        vocab_path: &str,
        merges_path: Option<&str>,
        lower_case: bool,
        strip_accents: Option<bool>,
        add_prefix_space: Option<bool>,
    ) -> Result<Self, QuacError> {
        let tokenizer = match model_type {
            ModelType::Bert => {
                if let Some(add_prefix_space) = add_prefix_space {
                    return Err(QuacError::InvalidConfigurationError(format!(
                        "Optional input `add_prefix_space` set to value {add_prefix_space} but cannot be used by {model_type:?}"
                    )));
                }
                TokenizerOption::Bert(BertTokenizer::from_file(
                    vocab_path,
                    lower_case,
                    strip_accents.unwrap_or(lower_case),
                )?)
            }
            ModelType::Roberta => {
                if let Some(strip_accents) = strip_accents {
                    return Err(QuacError::InvalidConfigurationError(format!(
                        "Optional input `strip_accents` set to value {strip_accents} but cannot be used by {model_type:?}"
                    )));
                }
                let merges_path = merges_path.ok_or_else(|| {
                    QuacError::InvalidConfigurationError(
                        "Roberta tokenizer requires a merges file".to_string(),
                    )
                })?;
                TokenizerOption::Roberta(RobertaTokenizer::from_file(
                    vocab_path,
                    merges_path,
                    lower_case,
                    add_prefix_space.unwrap_or(true),
                )?)
            }
            ModelType::XLNet => {
                if let Some(add_prefix_space) = add_prefix_space {
                    return Err(QuacError::InvalidConfigurationError(format!(
                        "Optional input `add_prefix_space` set to value {add_prefix_space} but cannot be used by {model_type:?}"
                    )));
                }
                TokenizerOption::XLNet(XLNetTokenizer::from_file(
                    vocab_path,
                    lower_case,
                    strip_accents.unwrap_or(false),
                )?)
            }
        };
        Ok(tokenizer)
    }

    /// Returns the model type
    pub fn model_type(&self) -> ModelType {
        match *self {
            Self::Bert(_) => ModelType::Bert,
            Self::Roberta(_) => ModelType::Roberta,
            Self::XLNet(_) => ModelType::XLNet,
        }
    }

    /// Interface method to tokenization
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.tokenize(text),
            Self::Roberta(ref tokenizer) => tokenizer.tokenize(text),
            Self::XLNet(ref tokenizer) => tokenizer.tokenize(text),
        }
    }

    /// Interface method to convert tokens to ids
    pub fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<i64> {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
            Self::Roberta(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
            Self::XLNet(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
        }
    }

    /// Interface method to convert a single id to its token
    pub fn id_to_token(&self, id: i64) -> String {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.vocab().id_to_token(&id),
            Self::Roberta(ref tokenizer) => tokenizer.vocab().id_to_token(&id),
            Self::XLNet(ref tokenizer) => tokenizer.vocab().id_to_token(&id),
        }
    }

    /// Interface method to convert a single token to its id
    pub fn token_to_id(&self, token: &str) -> i64 {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.vocab().token_to_id(token),
            Self::Roberta(ref tokenizer) => tokenizer.vocab().token_to_id(token),
            Self::XLNet(ref tokenizer) => tokenizer.vocab().token_to_id(token),
        }
    }

    /// Interface method to join tokens into a string
    pub fn convert_tokens_to_string(&self, tokens: Vec<String>) -> String {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.convert_tokens_to_string(tokens),
            Self::Roberta(ref tokenizer) => tokenizer.convert_tokens_to_string(tokens),
            Self::XLNet(ref tokenizer) => tokenizer.convert_tokens_to_string(tokens),
        }
    }

    fn special_token_strings(&self) -> (&'static str, &'static str, &'static str) {
        match *self {
            Self::Bert(_) => ("[CLS]", "[SEP]", "[PAD]"),
            Self::Roberta(_) => ("<s>", "</s>", "<pad>"),
            Self::XLNet(_) => ("<cls>", "<sep>", "<pad>"),
        }
    }
}

/// # Tokenizer used by the QuAC pipelines
/// Wraps a `TokenizerOption` together with its special tokens and conventions, resolved once at
/// construction.
pub struct QuacTokenizer {
    tokenizer: TokenizerOption,
    special_tokens: SpecialTokens,
    capabilities: TokenizerCapabilities,
}

impl QuacTokenizer {
    /// Builds a new `QuacTokenizer` from an existing `TokenizerOption`, using the default
    /// conventions of its model type (Roberta tokenizers are assumed to add a prefix space).
    ///
    /// Fails if one of the special tokens is missing from the tokenizer vocabulary.
    pub fn new(tokenizer: TokenizerOption) -> Result<Self, QuacError> {
        let (cls_token, sep_token, pad_token) = tokenizer.special_token_strings();
        let lookup = |token: &str| -> Result<i64, QuacError> {
            let id = tokenizer.token_to_id(token);
            if tokenizer.id_to_token(id) == token {
                Ok(id)
            } else {
                Err(QuacError::TokenizerError(format!(
                    "{token} token not found in vocabulary"
                )))
            }
        };
        let special_tokens = SpecialTokens {
            cls_token: cls_token.to_string(),
            cls_token_id: lookup(cls_token)?,
            sep_token: sep_token.to_string(),
            sep_token_id: lookup(sep_token)?,
            pad_token: pad_token.to_string(),
            pad_token_id: lookup(pad_token)?,
        };
        let capabilities = match tokenizer.model_type() {
            ModelType::Bert => TokenizerCapabilities {
                adds_prefix_space: false,
                uses_double_separator: false,
                padding_side: PaddingSide::Right,
            },
            ModelType::Roberta => TokenizerCapabilities {
                adds_prefix_space: true,
                uses_double_separator: true,
                padding_side: PaddingSide::Right,
            },
            ModelType::XLNet => TokenizerCapabilities {
                adds_prefix_space: false,
                uses_double_separator: false,
                padding_side: PaddingSide::Left,
            },
        };
        Ok(Self {
            tokenizer,
            special_tokens,
            capabilities,
        })
    }

    /// Loads a tokenizer from a vocabulary (and optional merges) file, see `TokenizerOption::from_file`
    pub fn from_file(
        model_type: ModelType,
        vocab_path: &str,
        merges_path: Option<&str>,
        lower_case: bool,
        strip_accents: Option<bool>,
        add_prefix_space: Option<bool>,
    ) -> Result<Self, QuacError> {
        let mut quac_tokenizer = Self::new(TokenizerOption::from_file(
            model_type,
            vocab_path,
            merges_path,
            lower_case,
            strip_accents,
            add_prefix_space,
        )?)?;
        if let Some(add_prefix_space) = add_prefix_space {
            quac_tokenizer.capabilities.adds_prefix_space = add_prefix_space;
        }
        Ok(quac_tokenizer)
    }

    pub fn model_type(&self) -> ModelType {
        self.tokenizer.model_type()
    }
}

impl QaTokenizer for QuacTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(text)
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<i64> {
        self.tokenizer.convert_tokens_to_ids(tokens)
    }

    fn convert_ids_to_tokens(&self, ids: &[i64]) -> Vec<String> {
        ids.iter().map(|id| self.tokenizer.id_to_token(*id)).collect()
    }

    fn convert_tokens_to_string(&self, tokens: &[String]) -> String {
        self.tokenizer.convert_tokens_to_string(tokens.to_vec())
    }

    fn special_tokens(&self) -> &SpecialTokens {
        &self.special_tokens
    }

    fn capabilities(&self) -> TokenizerCapabilities {
        self.capabilities
    }
}
