//! # Conversational question answering pipelines
//!
//! Pipelines turning QuAC dialogs into inputs for extractive question answering models, and the
//! outputs of these models back into answers. The neural network itself is external to this crate:
//! features are plain records holding token ids and masks, and results are plain start/end logits.
//!
//! #### 1. Tokenizers
//! The `common` module exposes the tokenizer abstraction used by the pipelines. Any sub-word
//! tokenizer implementing `QaTokenizer` can be used; `QuacTokenizer` wraps the BERT, RoBERTa and
//! XLNet tokenizers from `rust_tokenizers` with the conventions of their models (prefix space,
//! double separators, padding side).
//!
//! ```no_run
//! use rust_quac::pipelines::common::{ModelType, QaTokenizer, QuacTokenizer};
//! # fn main() -> anyhow::Result<()> {
//! let tokenizer = QuacTokenizer::from_file(
//!     ModelType::Roberta,
//!     "path/to/vocab.json",
//!     Some("path/to/merges.txt"),
//!     false,
//!     None,
//!     Some(true),
//! )?;
//! let tokens = tokenizer.tokenize("Where was he born?");
//! # Ok(())
//! # }
//! ```
//!
//! #### 2. QuAC
//! Feature extraction over overlapping context windows, prediction assembly and output writers.
//! See the `quac` module for an end-to-end example.

pub mod common;
pub mod quac;
