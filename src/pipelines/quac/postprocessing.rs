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
use crate::pipelines::common::QaTokenizer;
use crate::pipelines::quac::example::QuacExample;
use crate::pipelines::quac::features::QuacFeature;
use crate::pipelines::quac::text_projection::get_final_text;
use crate::pipelines::quac::{QuacConfig, CANNOT_ANSWER, NO_SPAN_SCORE_DIFF};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// # Model output for a single `QuacFeature`
pub struct QuacResult {
    /// `unique_id` of the feature this result was computed for
    pub unique_id: usize,
    /// Start logits, one per input position
    pub start_logits: Vec<f64>,
    /// End logits, one per input position
    pub end_logits: Vec<f64>,
    /// Answerability logit, for models exposing one
    pub class_logit: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// Answer `CANNOTANSWER`, scored with the null positions of a window
    Null,
    /// Span of context tokens
    Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// # Answer candidate before projection to the original text
pub struct PrelimPrediction {
    pub kind: CandidateKind,
    /// Index of the window in the features of the example
    pub feature_index: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub start_logit: f64,
    pub end_logit: f64,
    pub class_logit: Option<f64>,
}

impl PrelimPrediction {
    pub fn score(&self) -> f64 {
        self.start_logit + self.end_logit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// # Entry of the n-best list of an example
pub struct NBestEntry {
    pub text: String,
    pub probability: f64,
    pub start_logit: f64,
    pub end_logit: f64,
    /// Character position of the first occurrence of `text` in the context (-1 if absent)
    pub answer_start: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// # Final prediction for an example
pub struct QuacPrediction {
    pub qas_id: String,
    /// Predicted answer text, `CANNOTANSWER` if the question is predicted unanswerable
    pub answer: String,
    /// Distinct candidate answers, best first
    pub nbest: Vec<NBestEntry>,
    /// Null score minus the score of the best span candidate
    pub null_score_diff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// # Settings of the prediction assembly
pub struct PostProcessingSettings {
    pub n_best_size: usize,
    pub max_answer_length: usize,
    pub null_score_diff_threshold: f64,
    pub lower_case: bool,
    pub verbose_logging: bool,
}

/// Returns the indices of the `n_best_size` largest logits, largest first.
/// Ties are ordered by position.
pub fn get_best_indexes(logits: &[f64], n_best_size: usize) -> Vec<usize> {
    let mut index_and_score: Vec<(usize, f64)> = logits.iter().copied().enumerate().collect();
    index_and_score.sort_by_key(|(_, score)| Reverse(OrderedFloat(*score)));
    index_and_score
        .into_iter()
        .take(n_best_size)
        .map(|(index, _)| index)
        .collect()
}

/// Numerically stable softmax over raw scores
pub fn compute_softmax(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return vec![];
    }
    let max_score = scores
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, |max, score| max.max(score));
    let exp_scores: Vec<f64> = scores
        .iter()
        .map(|score| (score - max_score).exp())
        .collect();
    let total_sum: f64 = exp_scores.iter().sum();
    exp_scores.iter().map(|score| score / total_sum).collect()
}

fn find_character_position(context: &str, text: &str) -> i64 {
    context
        .find(text)
        .map_or(-1, |byte_position| {
            context[..byte_position].chars().count() as i64
        })
}

fn logit_at(logits: &[f64], position: usize, unique_id: usize) -> Result<f64, QuacError> {
    logits.get(position).copied().ok_or_else(|| {
        QuacError::ValueError(format!(
            "Result {} has no logit for position {}",
            unique_id, position
        ))
    })
}

struct NBestCandidate {
    text: String,
    start_logit: f64,
    end_logit: f64,
    answer_start: i64,
}

fn predict_example(
    example: &QuacExample,
    features: &[&QuacFeature],
    results: &HashMap<usize, &QuacResult>,
    tokenizer: &dyn QaTokenizer,
    settings: &PostProcessingSettings,
) -> Result<QuacPrediction, QuacError> {
    let mut prelim_predictions = vec![];
    let mut null_candidate: Option<PrelimPrediction> = None;

    for (feature_index, feature) in features.iter().enumerate() {
        let result = results.get(&feature.unique_id).ok_or_else(|| {
            QuacError::ValueError(format!(
                "No result found for feature {} (question {})",
                feature.unique_id, feature.qas_id
            ))
        })?;

        let null_start_logit = logit_at(&result.start_logits, feature.cls_index, result.unique_id)?;
        let null_end_logit = logit_at(&result.end_logits, feature.cls_index, result.unique_id)?;
        if null_candidate.map_or(true, |candidate| {
            null_start_logit + null_end_logit < candidate.score()
        }) {
            null_candidate = Some(PrelimPrediction {
                kind: CandidateKind::Null,
                feature_index,
                start_index: feature.cls_index,
                end_index: feature.cls_index,
                start_logit: null_start_logit,
                end_logit: null_end_logit,
                class_logit: result.class_logit,
            });
        }

        let start_indexes = get_best_indexes(&result.start_logits, settings.n_best_size);
        let end_indexes = get_best_indexes(&result.end_logits, settings.n_best_size);
        for &start_index in &start_indexes {
            for &end_index in &end_indexes {
                if start_index >= feature.tokens.len() || end_index >= feature.tokens.len() {
                    continue;
                }
                if !feature.token_to_orig_map.contains_key(&start_index)
                    || !feature.token_to_orig_map.contains_key(&end_index)
                {
                    continue;
                }
                if !feature
                    .token_is_max_context
                    .get(&start_index)
                    .copied()
                    .unwrap_or(false)
                {
                    continue;
                }
                if end_index < start_index {
                    continue;
                }
                if end_index - start_index + 1 > settings.max_answer_length {
                    continue;
                }
                prelim_predictions.push(PrelimPrediction {
                    kind: CandidateKind::Span,
                    feature_index,
                    start_index,
                    end_index,
                    start_logit: result.start_logits[start_index],
                    end_logit: result.end_logits[end_index],
                    class_logit: result.class_logit,
                });
            }
        }
    }

    let null_score = null_candidate.map(|candidate| candidate.score());
    prelim_predictions.extend(null_candidate);
    prelim_predictions.sort_by_key(|prediction| Reverse(OrderedFloat(prediction.score())));

    let mut seen_predictions: HashSet<String> = HashSet::new();
    let mut nbest: Vec<NBestCandidate> = vec![];
    for prediction in &prelim_predictions {
        if nbest.len() >= settings.n_best_size {
            break;
        }
        let final_text = match prediction.kind {
            CandidateKind::Span => {
                let feature = features[prediction.feature_index];
                let tok_tokens = &feature.tokens[prediction.start_index..=prediction.end_index];
                let orig_doc_start = feature.token_to_orig_map[&prediction.start_index];
                let orig_doc_end = feature.token_to_orig_map[&prediction.end_index];
                let orig_text = example.doc_tokens[orig_doc_start..=orig_doc_end].join(" ");
                let tok_text = tokenizer
                    .convert_tokens_to_string(tok_tokens)
                    .split_whitespace()
                    .collect::<Vec<&str>>()
                    .join(" ");
                get_final_text(
                    &tok_text,
                    &orig_text,
                    settings.lower_case,
                    settings.verbose_logging,
                )
            }
            CandidateKind::Null => CANNOT_ANSWER.to_string(),
        };
        if !seen_predictions.insert(final_text.clone()) {
            continue;
        }
        let answer_start = find_character_position(&example.context_text, &final_text);
        nbest.push(NBestCandidate {
            text: final_text,
            start_logit: prediction.start_logit,
            end_logit: prediction.end_logit,
            answer_start,
        });
    }

    if !seen_predictions.contains(CANNOT_ANSWER) {
        let (start_logit, end_logit) = null_candidate.map_or((0.0, 0.0), |candidate| {
            (candidate.start_logit, candidate.end_logit)
        });
        nbest.push(NBestCandidate {
            text: CANNOT_ANSWER.to_string(),
            start_logit,
            end_logit,
            answer_start: find_character_position(&example.context_text, CANNOT_ANSWER),
        });
    }

    let total_scores: Vec<f64> = nbest
        .iter()
        .map(|entry| entry.start_logit + entry.end_logit)
        .collect();
    let probabilities = compute_softmax(&total_scores);
    let best_non_null_entry = nbest.iter().find(|entry| entry.text != CANNOT_ANSWER);

    let (null_score_diff, answer) = match (best_non_null_entry, null_score) {
        (Some(entry), Some(null_score)) => {
            let score_diff = null_score - entry.start_logit - entry.end_logit;
            let answer = if score_diff > settings.null_score_diff_threshold {
                CANNOT_ANSWER.to_string()
            } else {
                entry.text.clone()
            };
            (score_diff, answer)
        }
        _ => (NO_SPAN_SCORE_DIFF, CANNOT_ANSWER.to_string()),
    };

    let nbest = nbest
        .into_iter()
        .zip(probabilities)
        .map(|(entry, probability)| NBestEntry {
            text: entry.text,
            probability,
            start_logit: entry.start_logit,
            end_logit: entry.end_logit,
            answer_start: entry.answer_start,
        })
        .collect();

    Ok(QuacPrediction {
        qas_id: example.qas_id.clone(),
        answer,
        nbest,
        null_score_diff,
    })
}

/// Assembles the predictions of a list of examples from the model results of their features.
///
/// For every example, the candidate spans of all its windows are ranked by the sum of their start
/// and end logits, projected back to the original context with `get_final_text` and de-duplicated.
/// The example is predicted unanswerable (`CANNOTANSWER`) when the lowest null score over its
/// windows exceeds the score of the best span by more than `config.null_score_diff_threshold`.
///
/// # Arguments
///
/// * `examples` - Examples the features were built from
/// * `features` - Features, as returned by `convert_examples_to_features`
/// * `results` - One model result per feature, matched by `unique_id`
/// * `tokenizer` - Tokenizer used to build the features
/// * `config` - `QuacConfig` holding the post-processing settings
///
/// # Returns
///
/// * `Vec<QuacPrediction>` one prediction per example, in the order of `examples`
///
/// # Errors
///
/// Returns a `QuacError::ValueError` if the result of a feature is missing, if two results share a
/// `unique_id` or if a result has no logit at the classification position of its feature.
pub fn compute_predictions_logits(
    examples: &[QuacExample],
    features: &[QuacFeature],
    results: &[QuacResult],
    tokenizer: &dyn QaTokenizer,
    config: &QuacConfig,
) -> Result<Vec<QuacPrediction>, QuacError> {
    config.validate(tokenizer.capabilities().pair_special_tokens())?;
    let settings = config.post_processing_settings();

    let mut example_index_to_features: HashMap<usize, Vec<&QuacFeature>> = HashMap::new();
    for feature in features {
        example_index_to_features
            .entry(feature.example_index)
            .or_default()
            .push(feature);
    }

    let mut unique_id_to_result: HashMap<usize, &QuacResult> =
        HashMap::with_capacity(results.len());
    for result in results {
        if unique_id_to_result.insert(result.unique_id, result).is_some() {
            return Err(QuacError::ValueError(format!(
                "Duplicate result for feature {}",
                result.unique_id
            )));
        }
    }

    let mut predictions = Vec::with_capacity(examples.len());
    for (example_index, example) in examples.iter().enumerate() {
        let example_features = example_index_to_features
            .get(&example_index)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        predictions.push(predict_example(
            example,
            example_features,
            &unique_id_to_result,
            tokenizer,
            &settings,
        )?);
    }
    log::info!("Computed predictions for {} QuAC examples", predictions.len());
    Ok(predictions)
}
