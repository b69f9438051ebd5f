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

use crate::common::error::QuacError;
use crate::pipelines::common::{PaddingSide, QaTokenizer, SpecialTokens, TokenizerCapabilities};
use crate::pipelines::quac::example::QuacExample;
use crate::pipelines::quac::windowing::{compute_doc_spans, is_max_context, DocSpan};
use crate::pipelines::quac::QuacConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::min;
use std::collections::HashMap;

/// First unique identifier given to the features of a conversion
const UNIQUE_ID_OFFSET: usize = 1_000_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// # Encoded model input for a single context window of a `QuacExample`
pub struct QuacFeature {
    /// Vocabulary ids of the encoded question/context pair, padded to the maximum sequence length
    pub input_ids: Vec<i64>,
    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<i8>,
    /// Segment ids of the question and context parts
    pub token_type_ids: Vec<i8>,
    /// Position of the classification token, used as the null answer position
    pub cls_index: usize,
    /// 1 for positions that cannot be part of an answer (question, special tokens, padding)
    pub p_mask: Vec<i8>,
    /// Position of the source example in the converted examples
    pub example_index: usize,
    /// Unique feature identifier, used to match model results
    pub unique_id: usize,
    /// Number of context tokens in this window
    pub paragraph_len: usize,
    /// For each context position, true if this window is the one giving the token its maximum context
    pub token_is_max_context: HashMap<usize, bool>,
    /// Tokens aligned with `input_ids`
    pub tokens: Vec<String>,
    /// Maps context positions to the index of the original whitespace-separated word
    pub token_to_orig_map: HashMap<usize, usize>,
    /// Answer start position (`cls_index` if the answer is not in this window)
    pub start_position: usize,
    /// Answer end position (`cls_index` if the answer is not in this window)
    pub end_position: usize,
    /// No answer can be found in this window
    pub is_impossible: bool,
    /// Identifier of the source question
    pub qas_id: String,
    /// Number of positions taken by the question and its special tokens
    pub query_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// # Encoding limits used by the feature conversion
pub struct FeatureSettings {
    pub max_seq_length: usize,
    pub doc_stride: usize,
    pub max_query_length: usize,
}

#[derive(Clone, Copy)]
/// # Read-only state handed to every feature conversion worker
pub struct FeatureConversionContext<'a> {
    pub tokenizer: &'a dyn QaTokenizer,
    pub settings: FeatureSettings,
}

impl<'a> FeatureConversionContext<'a> {
    pub fn new(tokenizer: &'a dyn QaTokenizer, settings: FeatureSettings) -> Self {
        FeatureConversionContext {
            tokenizer,
            settings,
        }
    }
}

struct EncodedPair {
    input_ids: Vec<i64>,
    attention_mask: Vec<i8>,
    token_type_ids: Vec<i8>,
    special_tokens_mask: Vec<i8>,
    doc_offset: usize,
    cls_index: usize,
    query_end: usize,
}

fn encode_pair(
    query_ids: &[i64],
    span_ids: &[i64],
    special_tokens: &SpecialTokens,
    capabilities: &TokenizerCapabilities,
    max_seq_length: usize,
) -> EncodedPair {
    let separators = capabilities.separators_between();
    let query_end = query_ids.len() + 1 + separators;
    let mut input_ids = Vec::with_capacity(max_seq_length);
    let mut token_type_ids = Vec::with_capacity(max_seq_length);
    let mut special_tokens_mask = Vec::with_capacity(max_seq_length);

    match capabilities.padding_side {
        PaddingSide::Right => {
            input_ids.push(special_tokens.cls_token_id);
            special_tokens_mask.push(1);
            input_ids.extend_from_slice(query_ids);
            special_tokens_mask.extend(std::iter::repeat(0).take(query_ids.len()));
            for _ in 0..separators {
                input_ids.push(special_tokens.sep_token_id);
                special_tokens_mask.push(1);
            }
            token_type_ids.extend(std::iter::repeat(0).take(input_ids.len()));
            let doc_offset = input_ids.len();

            input_ids.extend_from_slice(span_ids);
            special_tokens_mask.extend(std::iter::repeat(0).take(span_ids.len()));
            input_ids.push(special_tokens.sep_token_id);
            special_tokens_mask.push(1);
            token_type_ids.extend(std::iter::repeat(1).take(span_ids.len() + 1));

            let real_length = input_ids.len();
            let padding = max_seq_length.saturating_sub(real_length);
            input_ids.extend(std::iter::repeat(special_tokens.pad_token_id).take(padding));
            token_type_ids.extend(std::iter::repeat(0).take(padding));
            special_tokens_mask.extend(std::iter::repeat(1).take(padding));
            let mut attention_mask = vec![1; real_length];
            attention_mask.extend(std::iter::repeat(0).take(padding));

            EncodedPair {
                input_ids,
                attention_mask,
                token_type_ids,
                special_tokens_mask,
                doc_offset,
                cls_index: 0,
                query_end,
            }
        }
        PaddingSide::Left => {
            let real_length = span_ids.len() + query_ids.len() + 2 + separators;
            let padding = max_seq_length.saturating_sub(real_length);
            input_ids.extend(std::iter::repeat(special_tokens.pad_token_id).take(padding));
            token_type_ids.extend(std::iter::repeat(0).take(padding));
            special_tokens_mask.extend(std::iter::repeat(1).take(padding));
            let doc_offset = input_ids.len();

            input_ids.extend_from_slice(span_ids);
            special_tokens_mask.extend(std::iter::repeat(0).take(span_ids.len()));
            for _ in 0..separators {
                input_ids.push(special_tokens.sep_token_id);
                special_tokens_mask.push(1);
            }
            token_type_ids.extend(std::iter::repeat(0).take(span_ids.len() + separators));

            input_ids.extend_from_slice(query_ids);
            special_tokens_mask.extend(std::iter::repeat(0).take(query_ids.len()));
            input_ids.push(special_tokens.sep_token_id);
            special_tokens_mask.push(1);
            token_type_ids.extend(std::iter::repeat(1).take(query_ids.len() + 1));

            input_ids.push(special_tokens.cls_token_id);
            special_tokens_mask.push(1);
            token_type_ids.push(2);

            let mut attention_mask = vec![0; padding];
            attention_mask.extend(std::iter::repeat(1).take(real_length));
            let cls_index = input_ids.len() - 1;

            EncodedPair {
                input_ids,
                attention_mask,
                token_type_ids,
                special_tokens_mask,
                doc_offset,
                cls_index,
                query_end,
            }
        }
    }
}

/// Returns tokenized answer spans that better match the annotated answer.
///
/// The annotated answer is given at the word level: a word may be split in several sub-tokens, only
/// some of them being part of the answer (e.g. `1895` in `(1895-1943).`). All the sub-spans of
/// `[input_start, input_end]` are scanned, longest first for a given start, and the first one
/// matching the sub-word tokenization of the answer is returned. The input span is returned if no
/// sub-span matches.
pub fn improve_answer_span(
    doc_tokens: &[String],
    input_start: usize,
    input_end: usize,
    tokenizer: &dyn QaTokenizer,
    orig_answer_text: &str,
) -> (usize, usize) {
    if input_start > input_end || input_end >= doc_tokens.len() {
        return (input_start, input_end);
    }
    let tok_answer_text = tokenizer.tokenize(orig_answer_text).join(" ");

    for new_start in input_start..=input_end {
        for new_end in (new_start..=input_end).rev() {
            let text_span = doc_tokens[new_start..=new_end].join(" ");
            if text_span == tok_answer_text {
                return (new_start, new_end);
            }
        }
    }
    (input_start, input_end)
}

/// Converts a single example into one feature per context window.
///
/// The `example_index` and `unique_id` of the returned features are left to 0: they are assigned once
/// the features of all examples are gathered (see `convert_examples_to_features`).
pub fn convert_example_to_features(
    context: &FeatureConversionContext,
    example: &QuacExample,
) -> Result<Vec<QuacFeature>, QuacError> {
    let tokenizer = context.tokenizer;
    let settings = &context.settings;
    let special_tokens = tokenizer.special_tokens();
    let capabilities = tokenizer.capabilities();

    if !example.is_impossible {
        if let Some(answer_text) = &example.answer_text {
            let actual_text = example.answer_span_text();
            let cleaned_answer_text = answer_text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !actual_text.contains(&cleaned_answer_text) {
                log::warn!(
                    "Could not find answer: '{}' vs. '{}'",
                    actual_text,
                    cleaned_answer_text
                );
            }
        }
    }

    let mut tok_to_orig_index: Vec<usize> = vec![];
    let mut orig_to_tok_index: Vec<usize> = vec![];
    let mut all_doc_tokens: Vec<String> = vec![];
    for (word_index, word) in example.doc_tokens.iter().enumerate() {
        orig_to_tok_index.push(all_doc_tokens.len());
        for sub_token in tokenizer.tokenize(word) {
            tok_to_orig_index.push(word_index);
            all_doc_tokens.push(sub_token);
        }
    }
    if all_doc_tokens.is_empty() {
        return Ok(vec![]);
    }

    let answer_span = match (&example.answer_text, example.is_impossible) {
        (Some(answer_text), false) => {
            let last_token = all_doc_tokens.len() - 1;
            let tok_start_position = min(
                orig_to_tok_index
                    .get(example.start_position)
                    .copied()
                    .unwrap_or(0),
                last_token,
            );
            let tok_end_position = match orig_to_tok_index.get(example.end_position + 1) {
                Some(next_word_start) => next_word_start.saturating_sub(1),
                None => last_token,
            };
            let tok_end_position = tok_end_position.clamp(tok_start_position, last_token);
            Some(improve_answer_span(
                &all_doc_tokens,
                tok_start_position,
                tok_end_position,
                tokenizer,
                answer_text,
            ))
        }
        _ => None,
    };

    let mut query_tokens = tokenizer.tokenize(&example.question_text);
    query_tokens.truncate(settings.max_query_length);
    let truncated_query = tokenizer.convert_tokens_to_ids(&query_tokens);

    let capacity = settings
        .max_seq_length
        .checked_sub(truncated_query.len() + capabilities.pair_special_tokens())
        .filter(|capacity| *capacity > 0)
        .ok_or_else(|| {
            QuacError::InvalidConfigurationError(format!(
                "No room left for the context with a maximum sequence length of {} and a question of {} tokens",
                settings.max_seq_length,
                truncated_query.len()
            ))
        })?;
    if settings.doc_stride == 0 {
        return Err(QuacError::InvalidConfigurationError(
            "`doc_stride` must be strictly positive".to_string(),
        ));
    }
    let doc_spans = compute_doc_spans(all_doc_tokens.len(), capacity, settings.doc_stride);

    let mut features = Vec::with_capacity(doc_spans.len());
    for (span_index, doc_span) in doc_spans.iter().enumerate() {
        let DocSpan { start, length } = *doc_span;
        let span_ids = tokenizer.convert_tokens_to_ids(&all_doc_tokens[start..start + length]);
        let encoded = encode_pair(
            &truncated_query,
            &span_ids,
            special_tokens,
            &capabilities,
            settings.max_seq_length,
        );

        let mut token_to_orig_map = HashMap::with_capacity(length);
        let mut token_is_max_context = HashMap::with_capacity(length);
        for i in 0..length {
            token_to_orig_map.insert(encoded.doc_offset + i, tok_to_orig_index[start + i]);
            token_is_max_context.insert(
                encoded.doc_offset + i,
                is_max_context(&doc_spans, span_index, start + i),
            );
        }

        let mut p_mask = encoded.special_tokens_mask.clone();
        for (position, mask) in p_mask.iter_mut().enumerate() {
            if position < encoded.doc_offset || position >= encoded.doc_offset + length {
                *mask = 1;
            }
        }
        p_mask[encoded.cls_index] = 0;

        let cls_index = encoded.cls_index;
        let (start_position, end_position, is_impossible) = match answer_span {
            Some((tok_start_position, tok_end_position)) => {
                if tok_start_position >= doc_span.start && tok_end_position <= doc_span.end() {
                    (
                        tok_start_position - doc_span.start + encoded.doc_offset,
                        tok_end_position - doc_span.start + encoded.doc_offset,
                        false,
                    )
                } else {
                    (cls_index, cls_index, true)
                }
            }
            None => (cls_index, cls_index, example.is_impossible),
        };

        let tokens = tokenizer.convert_ids_to_tokens(&encoded.input_ids);
        features.push(QuacFeature {
            input_ids: encoded.input_ids,
            attention_mask: encoded.attention_mask,
            token_type_ids: encoded.token_type_ids,
            cls_index,
            p_mask,
            example_index: 0,
            unique_id: 0,
            paragraph_len: length,
            token_is_max_context,
            tokens,
            token_to_orig_map,
            start_position,
            end_position,
            is_impossible,
            qas_id: example.qas_id.clone(),
            query_end: encoded.query_end,
        });
    }
    Ok(features)
}

/// Converts a list of examples into features that can be directly given as input to a model.
///
/// The conversion of the examples is distributed over `config.threads` worker threads, each
/// working from its own `FeatureConversionContext`. Features are then gathered in the order of the
/// examples: `example_index` is the position of the source example in `examples` and `unique_id`s
/// are assigned sequentially starting from 1000000000.
pub fn convert_examples_to_features(
    examples: &[QuacExample],
    tokenizer: &dyn QaTokenizer,
    config: &QuacConfig,
) -> Result<Vec<QuacFeature>, QuacError> {
    config.validate(tokenizer.capabilities().pair_special_tokens())?;
    let context = FeatureConversionContext::new(tokenizer, config.feature_settings());

    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| QuacError::InvalidConfigurationError(e.to_string()))?;
    let example_features: Vec<Result<Vec<QuacFeature>, QuacError>> = thread_pool.install(|| {
        examples
            .par_iter()
            .map_init(
                || context,
                |context, example| convert_example_to_features(context, example),
            )
            .collect()
    });

    let mut features = Vec::with_capacity(examples.len());
    let mut unique_id = UNIQUE_ID_OFFSET;
    for (example_index, example_features) in example_features.into_iter().enumerate() {
        for mut feature in example_features? {
            feature.example_index = example_index;
            feature.unique_id = unique_id;
            unique_id += 1;
            features.push(feature);
        }
    }
    log::info!(
        "Converted {} QuAC examples into {} features",
        examples.len(),
        features.len()
    );
    Ok(features)
}
