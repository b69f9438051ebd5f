// Copyright 2020 The HuggingFace Team. All rights reserved.
// Copyright 2019-present Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # QuAC (Question Answering in Context) pipeline
//! Converts QuAC dialogs into model input features and turns the start/end logits produced by an
//! extractive question answering model back into answers.
//!
//! The pipeline is made of the following steps:
//! - `QuacProcessor` reads a QuAC JSON file and builds `QuacExample`s (one per question), splitting
//! the context on whitespace and mapping every character to its word,
//! - `convert_examples_to_features` tokenizes every example into sub-words and slides a window
//! with stride over long contexts, producing one `QuacFeature` per window,
//! - an external model produces a `QuacResult` per feature,
//! - `compute_predictions_logits` gathers the candidate spans of all windows of an example, projects
//! them back to the original text and decides between the best span and `CANNOTANSWER`.
//!
//! ```no_run
//! use rust_quac::pipelines::common::{ModelType, QuacTokenizer};
//! use rust_quac::pipelines::quac::{
//!     compute_predictions_logits, convert_examples_to_features, QuacConfig, QuacProcessor,
//!     QuacResult,
//! };
//! # fn main() -> anyhow::Result<()> {
//! let tokenizer = QuacTokenizer::from_file(
//!     ModelType::Bert,
//!     "path/to/vocab.txt",
//!     None,
//!     true,
//!     None,
//!     None,
//! )?;
//! let config = QuacConfig::default();
//! let processor = QuacProcessor::new(&tokenizer, config.history.clone());
//! let examples = processor.get_dev_examples("path/to/quac", None)?;
//! let features = convert_examples_to_features(&examples, &tokenizer, &config)?;
//!
//! // Model forward pass, one result per feature
//! let results: Vec<QuacResult> = features
//!     .iter()
//!     .map(|feature| QuacResult {
//!         unique_id: feature.unique_id,
//!         start_logits: vec![0f64; feature.input_ids.len()],
//!         end_logits: vec![0f64; feature.input_ids.len()],
//!         class_logit: None,
//!     })
//!     .collect();
//!
//! let predictions =
//!     compute_predictions_logits(&examples, &features, &results, &tokenizer, &config)?;
//! # Ok(())
//! # }
//! ```

mod basic_tokenizer;
mod example;
mod features;
mod history;
mod output;
mod postprocessing;
mod processor;
mod text_projection;
mod windowing;

pub use basic_tokenizer::BasicTokenizer;
pub use example::{is_whitespace, QuacExample};
pub use features::{
    convert_example_to_features, convert_examples_to_features, improve_answer_span,
    FeatureConversionContext, FeatureSettings, QuacFeature,
};
pub use history::{AnswerSource, HistoryConfig, PredictionGate, PreviousPrediction};
pub use output::{dialog_id, write_predictions, write_quac, PredictionOutputFiles};
pub use postprocessing::{
    compute_predictions_logits, compute_softmax, get_best_indexes, CandidateKind, NBestEntry,
    PostProcessingSettings, PrelimPrediction, QuacPrediction, QuacResult,
};
pub use processor::{QuacAnswer, QuacArticle, QuacDataset, QuacParagraph, QuacProcessor, QuacQa};
pub use text_projection::get_final_text;
pub use windowing::{compute_doc_spans, is_max_context, DocSpan};

use crate::common::error::QuacError;
use crate::Config;
use serde::{Deserialize, Serialize};

/// Null answer sentinel used by QuAC for unanswerable questions
pub const CANNOT_ANSWER: &str = "CANNOTANSWER";

/// Score difference reported when an example has no non-null candidate, forcing a null prediction
pub const NO_SPAN_SCORE_DIFF: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// # Configuration for the QuAC feature extraction and post-processing
pub struct QuacConfig {
    /// Maximum length of the encoded inputs (question, context window and special tokens)
    pub max_seq_length: usize,
    /// Number of sub-word tokens between the starts of two consecutive context windows
    pub doc_stride: usize,
    /// Maximum number of sub-word tokens kept from the question
    pub max_query_length: usize,
    /// Number of start and end candidates considered per window, and size of the n-best lists
    pub n_best_size: usize,
    /// Maximum length (in sub-word tokens) of a predicted answer
    pub max_answer_length: usize,
    /// `CANNOTANSWER` is predicted when the null score exceeds the best span score by more than this
    pub null_score_diff_threshold: f64,
    /// Lower-case the text when projecting predictions back to the original context
    pub lower_case: bool,
    /// Log the text projection failures
    pub verbose_logging: bool,
    /// Number of threads used for the feature conversion
    pub threads: usize,
    /// Conversation history prepended to the questions
    pub history: HistoryConfig,
}

impl Default for QuacConfig {
    fn default() -> QuacConfig {
        QuacConfig {
            max_seq_length: 384,
            doc_stride: 128,
            max_query_length: 64,
            n_best_size: 20,
            max_answer_length: 30,
            null_score_diff_threshold: 0.0,
            lower_case: false,
            verbose_logging: false,
            threads: 1,
            history: HistoryConfig::default(),
        }
    }
}

impl Config for QuacConfig {}

impl QuacConfig {
    /// Checks that the configuration can produce at least one context token per window.
    ///
    /// `max_special_tokens` is the number of special tokens added to a question/context pair by the
    /// tokenizer in use.
    pub fn validate(&self, max_special_tokens: usize) -> Result<(), QuacError> {
        if self.doc_stride == 0 {
            return Err(QuacError::InvalidConfigurationError(
                "`doc_stride` must be strictly positive".to_string(),
            ));
        }
        if self.n_best_size == 0 {
            return Err(QuacError::InvalidConfigurationError(
                "`n_best_size` must be strictly positive".to_string(),
            ));
        }
        if self.max_answer_length == 0 {
            return Err(QuacError::InvalidConfigurationError(
                "`max_answer_length` must be strictly positive".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(QuacError::InvalidConfigurationError(
                "`threads` must be strictly positive".to_string(),
            ));
        }
        if self.max_query_length + max_special_tokens >= self.max_seq_length {
            return Err(QuacError::InvalidConfigurationError(format!(
                "`max_seq_length` ({}) must exceed `max_query_length` ({}) plus the {} special tokens",
                self.max_seq_length, self.max_query_length, max_special_tokens
            )));
        }
        Ok(())
    }

    pub(crate) fn feature_settings(&self) -> FeatureSettings {
        FeatureSettings {
            max_seq_length: self.max_seq_length,
            doc_stride: self.doc_stride,
            max_query_length: self.max_query_length,
        }
    }

    pub(crate) fn post_processing_settings(&self) -> PostProcessingSettings {
        PostProcessingSettings {
            n_best_size: self.n_best_size,
            max_answer_length: self.max_answer_length,
            null_score_diff_threshold: self.null_score_diff_threshold,
            lower_case: self.lower_case,
            verbose_logging: self.verbose_logging,
        }
    }
}
