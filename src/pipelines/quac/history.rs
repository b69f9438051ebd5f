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

//! Conversation history prepended to QuAC questions. A question is followed by up to
//! `max_history` previous turns, oldest first, each made of the previous question and
//! (optionally) its answer, separated by the tokenizer separator token.

use crate::common::error::QuacError;
use crate::pipelines::quac::processor::QuacQa;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// # Filter deciding whether a previously predicted answer is trusted enough to be reused
pub enum PredictionGate {
    /// Keep answers with a confidence above the threshold
    Confidence(f64),
    /// Keep answers with an uncertainty below the threshold
    Uncertainty(f64),
    /// Keep answers for which `(confidence + 1 - uncertainty) / 2` is above the threshold
    ConfidenceUncertainty(f64),
}

impl PredictionGate {
    pub fn accepts(&self, prediction: &PreviousPrediction) -> bool {
        match *self {
            PredictionGate::Confidence(threshold) => prediction.confidence > threshold,
            PredictionGate::Uncertainty(threshold) => prediction.uncertainty < threshold,
            PredictionGate::ConfidenceUncertainty(threshold) => {
                (prediction.confidence + (1.0 - prediction.uncertainty)) / 2.0 > threshold
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// # Origin of the answers of previous turns
pub enum AnswerSource {
    /// Only previous questions are kept
    None,
    /// Annotated answers (`orig_answer`) of the previous turns
    Gold,
    /// Answers predicted for the previous turns, filtered by a gate
    Predicted(PredictionGate),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// # Configuration of the conversation history
pub struct HistoryConfig {
    /// Number of previous turns prepended to the question
    pub max_history: usize,
    /// Origin of the previous answers
    pub answer_source: AnswerSource,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_history: 1,
            answer_source: AnswerSource::Gold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// # Answer predicted for a previous turn
pub struct PreviousPrediction {
    pub predicted_answer_text: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub uncertainty: f64,
}

impl PreviousPrediction {
    /// Reads a `{qas_id: {predicted_answer_text, confidence, uncertainty}}` JSON file
    pub fn from_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<HashMap<String, PreviousPrediction>, QuacError> {
        let f = File::open(path.as_ref()).map_err(|e| {
            QuacError::IOError(format!(
                "Could not open previous predictions file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(serde_json::from_reader(BufReader::new(f))?)
    }
}

impl HistoryConfig {
    /// Builds the question text of turn `qa_index`, followed by its conversation history.
    pub(crate) fn build_question(
        &self,
        qas: &[QuacQa],
        qa_index: usize,
        separator: &str,
        previous_predictions: &HashMap<String, PreviousPrediction>,
    ) -> String {
        let mut question_text = qas[qa_index].question.clone();
        for distance in (1..=self.max_history).rev() {
            if distance > qa_index {
                continue;
            }
            let previous_qa = &qas[qa_index - distance];
            question_text.push_str(separator);
            question_text.push_str(&previous_qa.question);

            let previous_answer = match &self.answer_source {
                AnswerSource::None => None,
                AnswerSource::Gold => previous_qa
                    .canonical_answer()
                    .map(|answer| answer.text.as_str()),
                AnswerSource::Predicted(gate) => match previous_predictions.get(&previous_qa.id) {
                    Some(prediction) if gate.accepts(prediction) => {
                        Some(prediction.predicted_answer_text.as_str())
                    }
                    Some(_) => None,
                    None => {
                        log::debug!("No previous prediction found for {}", previous_qa.id);
                        None
                    }
                },
            };
            if let Some(previous_answer) = previous_answer {
                question_text.push_str(separator);
                question_text.push_str(previous_answer);
            }
        }
        question_text
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pipelines::quac::processor::QuacAnswer;

    fn turn(id: &str, question: &str, answer: &str) -> QuacQa {
        QuacQa {
            id: id.to_string(),
            question: question.to_string(),
            answers: vec![],
            orig_answer: Some(QuacAnswer {
                text: answer.to_string(),
                answer_start: 0,
            }),
            followup: None,
            yesno: None,
            rewrite: None,
        }
    }

    fn dialog() -> Vec<QuacQa> {
        vec![
            turn("d_q#0", "Who is he?", "A singer"),
            turn("d_q#1", "Where was he born?", "In Paris"),
            turn("d_q#2", "When?", "CANNOTANSWER"),
        ]
    }

    #[test]
    fn first_turn_has_no_history() {
        let config = HistoryConfig::default();
        let question = config.build_question(&dialog(), 0, "[SEP]", &HashMap::new());
        assert_eq!(question, "Who is he?");
    }

    #[test]
    fn gold_history_oldest_first() {
        let config = HistoryConfig {
            max_history: 2,
            answer_source: AnswerSource::Gold,
        };
        let question = config.build_question(&dialog(), 2, "[SEP]", &HashMap::new());
        assert_eq!(
            question,
            "When?[SEP]Who is he?[SEP]A singer[SEP]Where was he born?[SEP]In Paris"
        );
    }

    #[test]
    fn predicted_history_is_gated() {
        let config = HistoryConfig {
            max_history: 1,
            answer_source: AnswerSource::Predicted(PredictionGate::Confidence(0.5)),
        };
        let mut predictions = HashMap::new();
        predictions.insert(
            "d_q#0".to_string(),
            PreviousPrediction {
                predicted_answer_text: "a pop singer".to_string(),
                confidence: 0.9,
                uncertainty: 0.1,
            },
        );
        predictions.insert(
            "d_q#1".to_string(),
            PreviousPrediction {
                predicted_answer_text: "Lyon".to_string(),
                confidence: 0.2,
                uncertainty: 0.1,
            },
        );
        let dialog = dialog();
        assert_eq!(
            config.build_question(&dialog, 1, "</s></s>", &predictions),
            "Where was he born?</s></s>Who is he?</s></s>a pop singer"
        );
        assert_eq!(
            config.build_question(&dialog, 2, "</s></s>", &predictions),
            "When?</s></s>Where was he born?"
        );
    }

    #[test]
    fn combined_gate() {
        let prediction = PreviousPrediction {
            predicted_answer_text: "x".to_string(),
            confidence: 0.8,
            uncertainty: 0.4,
        };
        assert!(PredictionGate::ConfidenceUncertainty(0.69).accepts(&prediction));
        assert!(!PredictionGate::ConfidenceUncertainty(0.71).accepts(&prediction));
        assert!(PredictionGate::Uncertainty(0.5).accepts(&prediction));
        assert!(!PredictionGate::Uncertainty(0.4).accepts(&prediction));
    }
}
