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

use crate::pipelines::quac::CANNOT_ANSWER;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref ARTICLES: Regex = Regex::new(r"\b(a|an|the)\b").unwrap();
}

/// Lower cases a text and removes punctuation, articles and extra whitespace
pub fn normalize_answer(text: &str) -> String {
    let lower_cased = text.to_lowercase();
    let without_punctuation: String = lower_cased
        .chars()
        .filter(|character| !character.is_ascii_punctuation())
        .collect();
    let without_articles = ARTICLES.replace_all(&without_punctuation, " ");
    without_articles
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

fn count_tokens(text: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for token in text.split_whitespace() {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Bag-of-words F1 between the normalized prediction and reference
pub fn f1_score(prediction: &str, ground_truth: &str) -> f64 {
    let prediction = normalize_answer(prediction);
    let ground_truth = normalize_answer(ground_truth);
    let prediction_tokens = count_tokens(&prediction);
    let ground_truth_tokens = count_tokens(&ground_truth);

    let num_same: usize = prediction_tokens
        .iter()
        .map(|(token, count)| {
            ground_truth_tokens
                .get(token)
                .map_or(0, |ground_truth_count| (*count).min(*ground_truth_count))
        })
        .sum();
    if num_same == 0 {
        return 0.0;
    }
    let precision = num_same as f64 / prediction_tokens.values().sum::<usize>() as f64;
    let recall = num_same as f64 / ground_truth_tokens.values().sum::<usize>() as f64;
    (2.0 * precision * recall) / (precision + recall)
}

/// F1 between a prediction and a reference, `CANNOTANSWER` only matching itself
pub fn single_score(prediction: &str, ground_truth: &str) -> f64 {
    match (prediction == CANNOT_ANSWER, ground_truth == CANNOT_ANSWER) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => f1_score(prediction, ground_truth),
    }
}

/// Cleans the references of a question: a single `CANNOTANSWER` if at least half of the
/// annotators found no answer, the answer spans otherwise.
pub fn handle_cannot<S: AsRef<str>>(references: &[S]) -> Vec<String> {
    let num_cannot = references
        .iter()
        .filter(|reference| reference.as_ref() == CANNOT_ANSWER)
        .count();
    let num_spans = references.len() - num_cannot;
    if num_cannot >= num_spans {
        vec![CANNOT_ANSWER.to_string()]
    } else {
        references
            .iter()
            .map(|reference| reference.as_ref())
            .filter(|reference| *reference != CANNOT_ANSWER)
            .map(str::to_string)
            .collect()
    }
}

/// Human agreement: average over the references of their best F1 against the other references.
///
/// A single reference agrees with itself (1.0), no reference scores 0.0.
pub fn leave_one_out<S: AsRef<str>>(references: &[S]) -> f64 {
    match references.len() {
        0 => 0.0,
        1 => 1.0,
        num_references => {
            let mut total_f1 = 0.0;
            for (i, reference) in references.iter().enumerate() {
                let mut max_f1 = 0.0f64;
                for (j, other_reference) in references.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    max_f1 = max_f1.max(f1_score(reference.as_ref(), other_reference.as_ref()));
                }
                total_f1 += max_f1;
            }
            total_f1 / num_references as f64
        }
    }
}

/// Scores a prediction against each reference, then averages, over every held-out reference,
/// the best score against the remaining references.
///
/// A single reference returns its score, no reference scores 0.0.
pub fn leave_one_out_max<S: AsRef<str>>(prediction: &str, ground_truths: &[S]) -> f64 {
    let scores: Vec<f64> = ground_truths
        .iter()
        .map(|ground_truth| single_score(prediction, ground_truth.as_ref()))
        .collect();
    match scores.len() {
        0 => 0.0,
        1 => scores[0],
        num_scores => {
            let total: f64 = (0..num_scores)
                .map(|held_out| {
                    scores
                        .iter()
                        .enumerate()
                        .filter(|(index, _)| *index != held_out)
                        .map(|(_, score)| *score)
                        .fold(f64::NEG_INFINITY, f64::max)
                })
                .sum();
            total / num_scores as f64
        }
    }
}
