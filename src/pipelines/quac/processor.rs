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
use crate::pipelines::quac::history::{HistoryConfig, PreviousPrediction};
use crate::pipelines::quac::CANNOT_ANSWER;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// # Answer span annotation
pub struct QuacAnswer {
    pub text: String,
    #[serde(default)]
    pub answer_start: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// # Single dialog turn
pub struct QuacQa {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answers: Vec<QuacAnswer>,
    #[serde(default)]
    pub orig_answer: Option<QuacAnswer>,
    #[serde(default)]
    pub followup: Option<String>,
    #[serde(default)]
    pub yesno: Option<String>,
    #[serde(default)]
    pub rewrite: Option<String>,
}

impl QuacQa {
    /// Annotated answer of the turn: `orig_answer`, or the first reference answer if absent
    pub fn canonical_answer(&self) -> Option<&QuacAnswer> {
        self.orig_answer.as_ref().or_else(|| self.answers.first())
    }

    /// A turn is impossible if its annotated answer is `CANNOTANSWER` (or missing)
    pub fn is_impossible(&self) -> bool {
        self.canonical_answer()
            .map_or(true, |answer| answer.text == CANNOT_ANSWER)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// # Dialog: a context paragraph and the questions asked about it
pub struct QuacParagraph {
    #[serde(default)]
    pub id: String,
    pub context: String,
    pub qas: Vec<QuacQa>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuacArticle {
    #[serde(default)]
    pub title: String,
    pub paragraphs: Vec<QuacParagraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// # QuAC dataset in its SQuAD-like JSON layout
pub struct QuacDataset {
    pub data: Vec<QuacArticle>,
    #[serde(default)]
    pub version: Option<String>,
}

impl QuacDataset {
    /// Reads a QuAC dataset JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<QuacDataset, QuacError> {
        let f = File::open(path.as_ref()).map_err(|e| {
            QuacError::IOError(format!(
                "Could not open dataset file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let br = BufReader::new(f);
        Ok(serde_json::from_reader(br)?)
    }

    /// Iterates over all dialog turns of the dataset
    pub fn qas(&self) -> impl Iterator<Item = (&QuacParagraph, &QuacQa)> {
        self.data
            .iter()
            .flat_map(|article| article.paragraphs.iter())
            .flat_map(|paragraph| paragraph.qas.iter().map(move |qa| (paragraph, qa)))
    }
}

/// # Processor building `QuacExample`s from QuAC dataset files
pub struct QuacProcessor {
    separator: String,
    history: HistoryConfig,
    previous_predictions: HashMap<String, PreviousPrediction>,
}

impl QuacProcessor {
    pub const TRAIN_FILE: &'static str = "train.json";
    pub const DEV_FILE: &'static str = "dev.json";

    /// Creates a new processor. The tokenizer provides the separator inserted between the
    /// question and its history turns.
    pub fn new<T: QaTokenizer + ?Sized>(tokenizer: &T, history: HistoryConfig) -> QuacProcessor {
        let sep_token = tokenizer.special_tokens().sep_token.as_str();
        let separator = sep_token.repeat(tokenizer.capabilities().separators_between());
        QuacProcessor {
            separator,
            history,
            previous_predictions: HashMap::new(),
        }
    }

    /// Registers the answers predicted for previous turns, used by `AnswerSource::Predicted`
    pub fn with_previous_predictions(
        mut self,
        previous_predictions: HashMap<String, PreviousPrediction>,
    ) -> QuacProcessor {
        self.previous_predictions = previous_predictions;
        self
    }

    /// Returns the training examples from the data directory (`train.json` unless a file name is given)
    pub fn get_train_examples<P: AsRef<Path>>(
        &self,
        data_dir: P,
        filename: Option<&str>,
    ) -> Result<Vec<QuacExample>, QuacError> {
        let path = data_dir
            .as_ref()
            .join(filename.unwrap_or(QuacProcessor::TRAIN_FILE));
        let dataset = QuacDataset::from_file(path)?;
        Ok(self.create_examples(&dataset, true))
    }

    /// Returns the evaluation examples from the data directory (`dev.json` unless a file name is given)
    pub fn get_dev_examples<P: AsRef<Path>>(
        &self,
        data_dir: P,
        filename: Option<&str>,
    ) -> Result<Vec<QuacExample>, QuacError> {
        let path = data_dir
            .as_ref()
            .join(filename.unwrap_or(QuacProcessor::DEV_FILE));
        let dataset = QuacDataset::from_file(path)?;
        Ok(self.create_examples(&dataset, false))
    }

    /// Builds one example per dialog turn.
    ///
    /// Training examples are annotated with the first reference answer, evaluation examples with
    /// the original answer and keep all reference answers.
    pub fn create_examples(&self, dataset: &QuacDataset, is_training: bool) -> Vec<QuacExample> {
        let mut examples = Vec::new();
        for article in &dataset.data {
            for paragraph in &article.paragraphs {
                for (qa_index, qa) in paragraph.qas.iter().enumerate() {
                    let question_text = self.history.build_question(
                        &paragraph.qas,
                        qa_index,
                        &self.separator,
                        &self.previous_predictions,
                    );
                    let is_impossible = qa.is_impossible();
                    let (answer, answers) = match (is_impossible, is_training) {
                        (true, _) => (None, vec![]),
                        (false, true) => (qa.answers.first().or(qa.canonical_answer()), vec![]),
                        (false, false) => (qa.canonical_answer(), qa.answers.clone()),
                    };
                    let start_position_character = answer
                        .and_then(|answer| usize::try_from(answer.answer_start).ok());

                    examples.push(QuacExample::new(
                        &qa.id,
                        &question_text,
                        &paragraph.context,
                        answer.map(|answer| answer.text.as_str()),
                        start_position_character,
                        &article.title,
                        answers,
                        is_impossible,
                    ));
                }
            }
        }
        log::info!("Created {} QuAC examples", examples.len());
        examples
    }
}
