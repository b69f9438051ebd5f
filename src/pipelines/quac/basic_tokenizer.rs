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

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// # Vocabulary-free tokenizer splitting on whitespace and punctuation
/// Used to re-tokenize the original context when projecting a predicted answer back onto it.
/// Performs the following steps:
/// - removal of control characters and normalization of whitespace
/// - isolation of CJK characters
/// - optional lower casing and accent stripping
/// - splitting on punctuation
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicTokenizer {
    lower_case: bool,
}

impl BasicTokenizer {
    pub fn new(lower_case: bool) -> BasicTokenizer {
        BasicTokenizer { lower_case }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = tokenize_cjk_chars(&clean_text(text));
        let mut tokens = vec![];
        for word in text.split(is_whitespace) {
            if word.is_empty() {
                continue;
            }
            let word = if self.lower_case {
                strip_accents(&word.to_lowercase())
            } else {
                word.to_string()
            };
            tokens.extend(split_on_punctuation(&word));
        }
        tokens
    }
}

fn clean_text(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for character in text.chars() {
        if character == '\x00' || character == '\u{FFFD}' || is_control(&character) {
            continue;
        }
        if is_whitespace(character) {
            output.push(' ');
        } else {
            output.push(character);
        }
    }
    output
}

fn tokenize_cjk_chars(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for character in text.chars() {
        if is_cjk_char(&character) {
            output.push(' ');
            output.push(character);
            output.push(' ');
        } else {
            output.push(character);
        }
    }
    output
}

fn strip_accents(text: &str) -> String {
    text.nfd()
        .filter(|character| !is_combining_mark(*character))
        .collect()
}

fn split_on_punctuation(word: &str) -> Vec<String> {
    let mut output: Vec<String> = vec![];
    let mut start_new_word = true;
    for character in word.chars() {
        if is_punctuation(&character) {
            output.push(character.to_string());
            start_new_word = true;
        } else {
            if start_new_word {
                output.push(String::new());
            }
            if let Some(current_word) = output.last_mut() {
                current_word.push(character);
            }
            start_new_word = false;
        }
    }
    output
}

fn is_whitespace(character: char) -> bool {
    matches!(character, ' ' | '\t' | '\n' | '\r') || character.is_whitespace()
}

fn is_control(character: &char) -> bool {
    if matches!(character, '\t' | '\n' | '\r') {
        false
    } else {
        let u32_char = *character as u32;
        character.is_control()
            | ((0xE000..=0xF8FF).contains(&u32_char))
            | ((0xE0020..=0xE007F).contains(&u32_char))
            | (u32_char == 0x200B)
            | (u32_char == 0xFEFF)
    }
}

fn is_cjk_char(character: &char) -> bool {
    let u32_char = *character as u32;
    ((0x4E00..=0x9FFF).contains(&u32_char))
        | ((0x3400..=0x4DBF).contains(&u32_char))
        | ((0x20000..=0x2A6DF).contains(&u32_char))
        | ((0x2A700..=0x2B73F).contains(&u32_char))
        | ((0x2B740..=0x2B81F).contains(&u32_char))
        | ((0x2B820..=0x2CEAF).contains(&u32_char))
        | ((0xF900..=0xFAFF).contains(&u32_char))
        | ((0x2F800..=0x2FA1F).contains(&u32_char))
}

fn is_punctuation(character: &char) -> bool {
    let u32_char = *character as u32;
    character.is_ascii_punctuation()
        | matches!(u32_char, 0xA1 | 0xA7 | 0xAB | 0xB6 | 0xB7 | 0xBB | 0xBF)
        | ((0x2010..=0x2027).contains(&u32_char))
        | ((0x2030..=0x205E).contains(&u32_char))
        | ((0x2E00..=0x2E4F).contains(&u32_char))
        | ((0x3001..=0x3003).contains(&u32_char))
        | ((0x3008..=0x3011).contains(&u32_char))
        | ((0x3014..=0x301F).contains(&u32_char))
        | ((0xFF01..=0xFF0F).contains(&u32_char))
        | ((0xFF1A..=0xFF20).contains(&u32_char))
        | ((0xFF3B..=0xFF40).contains(&u32_char))
        | ((0xFF5B..=0xFF65).contains(&u32_char))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_on_whitespace_and_punctuation() {
        let tokenizer = BasicTokenizer::new(false);
        assert_eq!(
            tokenizer.tokenize("Steve Smith's  (1895-1943)."),
            vec!["Steve", "Smith", "'", "s", "(", "1895", "-", "1943", ")", "."]
        );
    }

    #[test]
    fn lower_cases_and_strips_accents() {
        let tokenizer = BasicTokenizer::new(true);
        assert_eq!(
            tokenizer.tokenize("Héllo\tWÖRLD!"),
            vec!["hello", "world", "!"]
        );
        let tokenizer = BasicTokenizer::new(false);
        assert_eq!(tokenizer.tokenize("Héllo"), vec!["Héllo"]);
    }

    #[test]
    fn isolates_cjk_characters() {
        let tokenizer = BasicTokenizer::new(false);
        assert_eq!(tokenizer.tokenize("ab中文c"), vec!["ab", "中", "文", "c"]);
    }

    #[test]
    fn removes_control_characters() {
        let tokenizer = BasicTokenizer::new(false);
        assert_eq!(tokenizer.tokenize("a\u{0}b\u{FFFD} c"), vec!["ab", "c"]);
        assert!(tokenizer.tokenize(" \n ").is_empty());
    }
}
