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
use crate::evaluation::metrics::{handle_cannot, leave_one_out, leave_one_out_max};
use crate::pipelines::quac::CANNOT_ANSWER;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Questions whose references agree less than this (leave-one-out F1) are not scored
pub const MIN_HUMAN_F1: f64 = 0.4;

#[derive(Debug, Deserialize)]
struct GoldFile {
    data: Vec<GoldArticle>,
}

#[derive(Debug, Deserialize)]
struct GoldArticle {
    paragraphs: Vec<GoldParagraph>,
}

#[derive(Debug, Deserialize)]
struct GoldParagraph {
    qas: Vec<GoldQa>,
}

#[derive(Debug, Deserialize)]
struct GoldQa {
    id: String,
    #[serde(default)]
    answers: Vec<GoldAnswer>,
}

#[derive(Debug, Deserialize)]
struct GoldAnswer {
    text: String,
}

fn open_json<P: AsRef<Path>>(path: P) -> Result<BufReader<File>, QuacError> {
    let f = File::open(path.as_ref()).map_err(|e| {
        QuacError::IOError(format!("Could not open {}: {}", path.as_ref().display(), e))
    })?;
    Ok(BufReader::new(f))
}

fn read_gold_file<P: AsRef<Path>>(path: P) -> Result<GoldFile, QuacError> {
    Ok(serde_json::from_reader(open_json(path)?)?)
}

/// Reads the reference answers of a QuAC dataset file (`data[].paragraphs[].qas[].answers[].text`)
pub fn read_target_dict<P: AsRef<Path>>(
    path: P,
) -> Result<HashMap<String, Vec<String>>, QuacError> {
    let gold = read_gold_file(path)?;
    let mut target_dict = HashMap::new();
    for qa in gold
        .data
        .into_iter()
        .flat_map(|article| article.paragraphs)
        .flat_map(|paragraph| paragraph.qas)
    {
        let references = qa.answers.into_iter().map(|answer| answer.text).collect();
        target_dict.insert(qa.id, references);
    }
    Ok(target_dict)
}

/// Reads the reference answers of a QuAC dataset file, dropping the `CANNOTANSWER` references and
/// the questions left without reference.
pub fn read_target_dict_excluding_cannot_answer<P: AsRef<Path>>(
    path: P,
) -> Result<HashMap<String, Vec<String>>, QuacError> {
    let mut target_dict = read_target_dict(path)?;
    for references in target_dict.values_mut() {
        references.retain(|reference| reference != CANNOT_ANSWER);
    }
    target_dict.retain(|_, references| !references.is_empty());
    Ok(target_dict)
}

/// Reads a `{qas_id: answer}` predictions file
pub fn read_predictions<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, QuacError> {
    Ok(serde_json::from_reader(open_json(path)?)?)
}

fn score_predictions<'a, I>(pairs: I) -> Result<f64, QuacError>
where
    I: Iterator<Item = (&'a str, &'a [String])>,
{
    let mut total_f1 = 0.0;
    let mut num_scored = 0usize;
    for (prediction, references) in pairs {
        let prediction = if prediction.is_empty() {
            CANNOT_ANSWER
        } else {
            prediction
        };
        let clean_references = handle_cannot(references);
        if leave_one_out(&clean_references) < MIN_HUMAN_F1 {
            continue;
        }
        total_f1 += leave_one_out_max(prediction, &clean_references);
        num_scored += 1;
    }
    if num_scored == 0 {
        return Err(QuacError::ValueError(
            "No question with sufficient human agreement to score".to_string(),
        ));
    }
    Ok(100.0 * total_f1 / num_scored as f64)
}

/// Computes the QuAC F1 of a set of predictions.
///
/// Empty predictions are read as `CANNOTANSWER`. References are cleaned with `handle_cannot` and
/// questions whose human agreement is below `MIN_HUMAN_F1` are skipped. The remaining questions
/// are scored with `leave_one_out_max` and the average is returned as a percentage.
///
/// # Errors
///
/// Returns a `QuacError::ValueError` if a prediction has no reference or if no question is scored.
pub fn quac_performance(
    predictions: &HashMap<String, String>,
    target_dict: &HashMap<String, Vec<String>>,
) -> Result<f64, QuacError> {
    let mut pairs = Vec::with_capacity(predictions.len());
    for (qas_id, prediction) in predictions {
        let references = target_dict.get(qas_id).ok_or_else(|| {
            QuacError::ValueError(format!("No reference answer found for {}", qas_id))
        })?;
        pairs.push((prediction.as_str(), references.as_slice()));
    }
    score_predictions(pairs.into_iter())
}

/// Computes the QuAC F1 of the predictions whose question has a reference answer.
///
/// Used with `read_target_dict_excluding_cannot_answer`: predictions without reference are
/// counted as gold `CANNOTANSWER` questions and skipped.
///
/// # Returns
///
/// * `(f64, usize, usize)` F1 percentage, number of gold `CANNOTANSWER` questions and total number of predictions
pub fn quac_performance_excluding_cannot_answer(
    predictions: &HashMap<String, String>,
    target_dict: &HashMap<String, Vec<String>>,
) -> Result<(f64, usize, usize), QuacError> {
    let mut num_gold_cannot_answer = 0;
    let mut pairs = Vec::with_capacity(predictions.len());
    for (qas_id, prediction) in predictions {
        match target_dict.get(qas_id) {
            Some(references) => pairs.push((prediction.as_str(), references.as_slice())),
            None => num_gold_cannot_answer += 1,
        }
    }
    let f1 = score_predictions(pairs.into_iter())?;
    Ok((f1, num_gold_cannot_answer, predictions.len()))
}
