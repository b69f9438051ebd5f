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
use crate::pipelines::quac::postprocessing::QuacPrediction;
use crate::pipelines::quac::processor::QuacDataset;
use crate::pipelines::quac::CANNOT_ANSWER;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
/// # Destination of the prediction artifacts, files are only written when a path is given
pub struct PredictionOutputFiles {
    /// `{qas_id: answer}`
    pub prediction_file: Option<PathBuf>,
    /// `{qas_id: [{text, probability, start_logit, end_logit}]}`
    pub nbest_file: Option<PathBuf>,
    /// `{qas_id: null_score_diff}`
    pub null_log_odds_file: Option<PathBuf>,
    /// `{qas_id: [{text, probability, start_logit, end_logit, answer_start}]}`
    pub nbest_with_start_index_file: Option<PathBuf>,
}

fn create_file(path: &Path) -> Result<BufWriter<File>, QuacError> {
    let f = File::create(path).map_err(|e| {
        QuacError::IOError(format!("Could not create {}: {}", path.display(), e))
    })?;
    Ok(BufWriter::new(f))
}

fn write_json(path: &Path, value: &Value) -> Result<(), QuacError> {
    let mut writer = create_file(path)?;
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut serializer)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes the prediction artifacts for which a destination is set.
pub fn write_predictions(
    predictions: &[QuacPrediction],
    output_files: &PredictionOutputFiles,
) -> Result<(), QuacError> {
    if let Some(path) = &output_files.prediction_file {
        log::info!("Writing predictions to: {}", path.display());
        let all_predictions: Map<String, Value> = predictions
            .iter()
            .map(|prediction| (prediction.qas_id.clone(), json!(prediction.answer)))
            .collect();
        write_json(path, &Value::Object(all_predictions))?;
    }
    if let Some(path) = &output_files.nbest_file {
        log::info!("Writing nbest to: {}", path.display());
        let all_nbest: Map<String, Value> = predictions
            .iter()
            .map(|prediction| {
                let entries = prediction
                    .nbest
                    .iter()
                    .map(|entry| {
                        json!({
                            "text": entry.text,
                            "probability": entry.probability,
                            "start_logit": entry.start_logit,
                            "end_logit": entry.end_logit,
                        })
                    })
                    .collect::<Vec<Value>>();
                (prediction.qas_id.clone(), Value::Array(entries))
            })
            .collect();
        write_json(path, &Value::Object(all_nbest))?;
    }
    if let Some(path) = &output_files.null_log_odds_file {
        log::info!("Writing null_log_odds to: {}", path.display());
        let scores_diff: Map<String, Value> = predictions
            .iter()
            .map(|prediction| (prediction.qas_id.clone(), json!(prediction.null_score_diff)))
            .collect();
        write_json(path, &Value::Object(scores_diff))?;
    }
    if let Some(path) = &output_files.nbest_with_start_index_file {
        log::info!("Writing nbest with start index to: {}", path.display());
        let all_nbest_start: Map<String, Value> = predictions
            .iter()
            .map(|prediction| (prediction.qas_id.clone(), json!(prediction.nbest)))
            .collect();
        write_json(path, &Value::Object(all_nbest_start))?;
    }
    Ok(())
}

/// Returns the dialog identifier of a question identifier (the part preceding `_q#`)
pub fn dialog_id(qas_id: &str) -> &str {
    qas_id.split("_q#").next().unwrap_or(qas_id)
}

#[derive(Debug, Default, Serialize)]
struct DialogPrediction {
    best_span_str: Vec<String>,
    qid: Vec<String>,
    yesno: Vec<String>,
    followup: Vec<String>,
}

impl DialogPrediction {
    fn push(&mut self, qas_id: &str, span: &str) {
        self.best_span_str.push(span.to_string());
        self.qid.push(qas_id.to_string());
        self.yesno.push("y".to_string());
        self.followup.push("y".to_string());
    }
}

/// Writes the predictions in the official QuAC scorer format: one JSON object per line and per
/// dialog, `{"best_span_str": [...], "qid": [...], "yesno": [...], "followup": [...]}`.
///
/// Dialogs are written in order of first appearance in `predictions`, followed by the dialogs of
/// `dataset` without any prediction. Within a dialog, turns follow the order of `dataset`, and
/// predictions for questions absent from `dataset` come last. Empty answers are replaced by
/// `CANNOTANSWER`, as are the answers of the questions of `dataset` without prediction. Yes/no and
/// follow-up acts are not predicted and set to `y`.
pub fn write_quac<P: AsRef<Path>>(
    predictions: &[QuacPrediction],
    dataset: &QuacDataset,
    output_path: P,
) -> Result<(), QuacError> {
    let mut dataset_turns: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut turn_dialogs: HashMap<&str, &str> = HashMap::new();
    let mut dataset_dialogs: Vec<&str> = vec![];
    for (paragraph, qa) in dataset.qas() {
        let id = if paragraph.id.is_empty() {
            dialog_id(&qa.id)
        } else {
            paragraph.id.as_str()
        };
        let turns = dataset_turns.entry(id).or_insert_with(|| {
            dataset_dialogs.push(id);
            vec![]
        });
        turns.push(qa.id.as_str());
        turn_dialogs.insert(qa.id.as_str(), id);
    }

    let mut answers: HashMap<&str, &str> = HashMap::with_capacity(predictions.len());
    let mut extra_turns: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut dialog_order: Vec<&str> = vec![];
    let mut seen_dialogs: HashSet<&str> = HashSet::new();
    for prediction in predictions {
        let qas_id = prediction.qas_id.as_str();
        let span = if prediction.answer.is_empty() {
            CANNOT_ANSWER
        } else {
            prediction.answer.as_str()
        };
        let id = match turn_dialogs.get(qas_id) {
            Some(id) => *id,
            None => {
                let id = dialog_id(qas_id);
                if !answers.contains_key(qas_id) {
                    extra_turns.entry(id).or_default().push(qas_id);
                }
                id
            }
        };
        answers.insert(qas_id, span);
        if seen_dialogs.insert(id) {
            dialog_order.push(id);
        }
    }
    for id in dataset_dialogs {
        if seen_dialogs.insert(id) {
            dialog_order.push(id);
        }
    }

    let mut writer = create_file(output_path.as_ref())?;
    for id in &dialog_order {
        let mut dialog = DialogPrediction::default();
        let turns = dataset_turns.get(id).into_iter().flatten();
        for qas_id in turns.chain(extra_turns.get(id).into_iter().flatten()) {
            dialog.push(qas_id, answers.get(qas_id).copied().unwrap_or(CANNOT_ANSWER));
        }
        serde_json::to_writer(&mut writer, &dialog)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    log::info!(
        "Wrote {} QuAC dialogs to {}",
        dialog_order.len(),
        output_path.as_ref().display()
    );
    Ok(())
}
