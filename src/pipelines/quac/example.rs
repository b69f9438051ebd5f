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

use crate::pipelines::quac::processor::QuacAnswer;
use std::cmp::min;

/// Whitespace characters separating the context words
pub fn is_whitespace(character: &char) -> bool {
    (character == &' ')
        | (character == &'\t')
        | (character == &'\r')
        | (character == &'\n')
        | (*character as u32 == 0x202F)
}

#[derive(Debug, Clone)]
/// # A single QuAC question with its context, as read from the dataset
pub struct QuacExample {
    /// Unique question identifier (`<dialog id>_q#<turn>`)
    pub qas_id: String,
    /// Question, possibly prefixed with the conversation history
    pub question_text: String,
    /// Context paragraph
    pub context_text: String,
    /// Annotated answer, if known
    pub answer_text: Option<String>,
    /// Character position of the annotated answer in the context
    pub start_position_character: Option<usize>,
    /// Title of the article
    pub title: String,
    /// The question cannot be answered from the context
    pub is_impossible: bool,
    /// All reference answers (evaluation only)
    pub answers: Vec<QuacAnswer>,
    /// Context split on whitespace
    pub doc_tokens: Vec<String>,
    /// Index of the word each context character belongs to (-1 for leading whitespace)
    pub char_to_word_offset: Vec<i64>,
    /// Index of the first word of the annotated answer
    pub start_position: usize,
    /// Index of the last word of the annotated answer
    pub end_position: usize,
}

impl QuacExample {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        qas_id: &str,
        question_text: &str,
        context_text: &str,
        answer_text: Option<&str>,
        start_position_character: Option<usize>,
        title: &str,
        answers: Vec<QuacAnswer>,
        is_impossible: bool,
    ) -> QuacExample {
        let (doc_tokens, char_to_word_offset) = QuacExample::split_context(context_text);

        let (start_position, end_position) = match (answer_text, start_position_character) {
            (Some(answer_text), Some(start_character)) if !is_impossible => {
                QuacExample::word_positions(&char_to_word_offset, answer_text, start_character)
            }
            _ => (0, 0),
        };

        QuacExample {
            qas_id: qas_id.to_owned(),
            question_text: question_text.to_owned(),
            context_text: context_text.to_owned(),
            answer_text: answer_text.map(str::to_owned),
            start_position_character,
            title: title.to_owned(),
            is_impossible,
            answers,
            doc_tokens,
            char_to_word_offset,
            start_position,
            end_position,
        }
    }

    fn split_context(context: &str) -> (Vec<String>, Vec<i64>) {
        let mut doc_tokens: Vec<String> = vec![];
        let mut char_to_word_offset: Vec<i64> = vec![];
        let mut previous_whitespace = true;

        for character in context.chars() {
            if QuacExample::is_whitespace(&character) {
                previous_whitespace = true;
            } else {
                if previous_whitespace {
                    doc_tokens.push(String::new());
                }
                if let Some(current_word) = doc_tokens.last_mut() {
                    current_word.push(character);
                }
                previous_whitespace = false;
            }
            char_to_word_offset.push(doc_tokens.len() as i64 - 1);
        }
        (doc_tokens, char_to_word_offset)
    }

    fn is_whitespace(character: &char) -> bool {
        is_whitespace(character)
    }

    fn word_positions(
        char_to_word_offset: &[i64],
        answer_text: &str,
        start_character: usize,
    ) -> (usize, usize) {
        if char_to_word_offset.is_empty() {
            return (0, 0);
        }
        let answer_length = answer_text.chars().count();
        let end_character = min(
            (start_character + answer_length).saturating_sub(1),
            char_to_word_offset.len() - 1,
        );
        let word_index = |character: usize| -> usize {
            char_to_word_offset
                .get(character)
                .map(|&offset| offset.max(0) as usize)
                .unwrap_or(0)
        };
        (word_index(start_character), word_index(end_character))
    }

    /// Returns the word-level span of the annotated answer, joined by single spaces
    pub fn answer_span_text(&self) -> String {
        if self.doc_tokens.is_empty() {
            return String::new();
        }
        let end = min(self.end_position, self.doc_tokens.len() - 1);
        let start = min(self.start_position, end);
        self.doc_tokens[start..=end].join(" ")
    }
}
