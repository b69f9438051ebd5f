//! Feature extraction and evaluation for conversational question answering on QuAC
//! (Question Answering in Context).
//!
//! This crate prepares QuAC dialogs for extractive question answering models (BERT, RoBERTa,
//! XLNet) and scores their predictions with the official QuAC metric:
//! - the questions of a dialog are prefixed with the previous turns of the conversation,
//! - contexts are split on whitespace, tokenized into sub-words and covered by overlapping windows,
//! - each window is encoded as a fixed-length feature with its answer positions,
//! - the start/end logits produced by the model for every window are assembled into a single
//! answer per question, projected back onto the original context, or `CANNOTANSWER`,
//! - predictions are scored with leave-one-out F1 against several human references.
//!
//! The model itself is out of scope: any model producing start and end logits for the features
//! can be plugged in.
//!
//! ```no_run
//! use rust_quac::evaluation::{quac_performance, read_target_dict};
//! use rust_quac::pipelines::common::{ModelType, QuacTokenizer};
//! use rust_quac::pipelines::quac::{
//!     compute_predictions_logits, convert_examples_to_features, QuacConfig, QuacProcessor,
//!     QuacResult,
//! };
//! use rust_quac::Config;
//! use std::collections::HashMap;
//! # fn main() -> anyhow::Result<()> {
//! let config = QuacConfig::from_file("quac_config.json")?;
//! let tokenizer = QuacTokenizer::from_file(
//!     ModelType::Bert,
//!     "path/to/vocab.txt",
//!     None,
//!     true,
//!     None,
//!     None,
//! )?;
//!
//! let processor = QuacProcessor::new(&tokenizer, config.history.clone());
//! let examples = processor.get_dev_examples("path/to/quac", None)?;
//! let features = convert_examples_to_features(&examples, &tokenizer, &config)?;
//! # let results: Vec<QuacResult> = vec![];
//! // results: model outputs, one `QuacResult` per feature
//! let predictions =
//!     compute_predictions_logits(&examples, &features, &results, &tokenizer, &config)?;
//!
//! let predictions: HashMap<String, String> = predictions
//!     .into_iter()
//!     .map(|prediction| (prediction.qas_id, prediction.answer))
//!     .collect();
//! let f1 = quac_performance(&predictions, &read_target_dict("path/to/quac/dev.json")?)?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod evaluation;
pub mod pipelines;

pub use common::error::QuacError;
pub use common::resources;
pub use common::Config;
