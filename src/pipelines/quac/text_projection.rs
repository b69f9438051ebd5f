// Copyright 2018 The Google AI Language Team Authors
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

use crate::pipelines::quac::basic_tokenizer::BasicTokenizer;
use std::collections::HashMap;

/// Removes the spaces of a text, returning the remaining characters and, for each of them, its
/// position in the input
fn strip_spaces(text: &[char]) -> (Vec<char>, Vec<usize>) {
    let mut ns_chars = Vec::with_capacity(text.len());
    let mut ns_to_s_map = Vec::with_capacity(text.len());
    for (position, character) in text.iter().enumerate() {
        if *character == ' ' {
            continue;
        }
        ns_chars.push(*character);
        ns_to_s_map.push(position);
    }
    (ns_chars, ns_to_s_map)
}

/// Projects a tokenized prediction back to the original text.
///
/// The prediction comes from de-tokenized sub-words (e.g. `steve smith`), while the answer should
/// be the matching span of the original text (e.g. `Steve Smith` in `Steve Smith's`). The original
/// text is re-tokenized with a `BasicTokenizer`, the prediction is located in it and both texts are
/// aligned character by character once their spaces are removed.
///
/// The original text is returned unchanged when the prediction cannot be located or when the
/// alignment fails. All positions are character (not byte) positions.
///
/// # Arguments
///
/// * `pred_text` - De-tokenized prediction
/// * `orig_text` - Span of the original context covering the predicted words
/// * `lower_case` - Lower case (and strip accents of) the original text before searching the prediction
/// * `verbose_logging` - Log alignment failures
///
/// # Example
///
/// ```
/// use rust_quac::pipelines::quac::get_final_text;
///
/// let answer = get_final_text("steve smith", "Steve Smith's", true, false);
/// assert_eq!(answer, "Steve Smith");
/// ```
pub fn get_final_text(
    pred_text: &str,
    orig_text: &str,
    lower_case: bool,
    verbose_logging: bool,
) -> String {
    let tokenizer = BasicTokenizer::new(lower_case);
    let tok_text = tokenizer.tokenize(orig_text).join(" ");

    let start_position = match tok_text.find(pred_text) {
        Some(byte_position) => tok_text[..byte_position].chars().count(),
        None => {
            if verbose_logging {
                log::info!("Unable to find text: '{}' in '{}'", pred_text, orig_text);
            }
            return orig_text.to_string();
        }
    };
    let pred_length = pred_text.chars().count();
    if pred_length == 0 {
        return orig_text.to_string();
    }
    let end_position = start_position + pred_length - 1;

    let orig_chars: Vec<char> = orig_text.chars().collect();
    let tok_chars: Vec<char> = tok_text.chars().collect();
    let (orig_ns_text, orig_ns_to_s_map) = strip_spaces(&orig_chars);
    let (tok_ns_text, tok_ns_to_s_map) = strip_spaces(&tok_chars);

    if orig_ns_text.len() != tok_ns_text.len() {
        if verbose_logging {
            log::info!(
                "Length not equal after stripping spaces: '{}' vs '{}'",
                orig_ns_text.iter().collect::<String>(),
                tok_ns_text.iter().collect::<String>()
            );
        }
        return orig_text.to_string();
    }

    let tok_s_to_ns_map: HashMap<usize, usize> = tok_ns_to_s_map
        .iter()
        .enumerate()
        .map(|(ns_position, s_position)| (*s_position, ns_position))
        .collect();

    let orig_position = |tok_position: usize| -> Option<usize> {
        tok_s_to_ns_map
            .get(&tok_position)
            .and_then(|ns_position| orig_ns_to_s_map.get(*ns_position))
            .copied()
    };

    let orig_start_position = match orig_position(start_position) {
        Some(position) => position,
        None => {
            if verbose_logging {
                log::info!("Couldn't map start position");
            }
            return orig_text.to_string();
        }
    };
    let orig_end_position = match orig_position(end_position) {
        Some(position) => position,
        None => {
            if verbose_logging {
                log::info!("Couldn't map end position");
            }
            return orig_text.to_string();
        }
    };
    if orig_end_position < orig_start_position {
        return orig_text.to_string();
    }

    orig_chars[orig_start_position..=orig_end_position]
        .iter()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn drops_trailing_possessive() {
        assert_eq!(
            get_final_text("steve smith", "Steve Smith's", true, false),
            "Steve Smith"
        );
    }

    #[test]
    fn extracts_sub_word_span() {
        assert_eq!(get_final_text("1895", "(1895-1943).", false, false), "1895");
    }

    #[test]
    fn restores_original_spacing() {
        assert_eq!(
            get_final_text("new york", "in New  York,", true, false),
            "New  York"
        );
    }

    #[test]
    fn non_ascii_text() {
        assert_eq!(get_final_text("köln", "Köln.", false, false), "Köln.");
        assert_eq!(get_final_text("Köln", "Köln.", false, false), "Köln");
    }

    #[test]
    fn falls_back_to_original_text() {
        // prediction not found
        assert_eq!(get_final_text("paris", "Steve", true, true), "Steve");
        // accent stripping changes the length of the text
        assert_eq!(get_final_text("e", "e\u{0301}", true, false), "e\u{0301}");
    }
}
