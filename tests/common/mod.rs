#![allow(dead_code)]

use rust_quac::pipelines::common::{
    PaddingSide, QaTokenizer, SpecialTokens, TokenizerCapabilities,
};
use rust_quac::pipelines::quac::QuacExample;
use std::collections::HashMap;

pub const PAD_ID: i64 = 0;
pub const UNK_ID: i64 = 1;
pub const CLS_ID: i64 = 2;
pub const SEP_ID: i64 = 3;

/// Word-piece like tokenizer over a vocabulary built from a corpus: lower cases, splits on
/// whitespace and punctuation and cuts words into pieces of at most 4 characters.
pub struct ToyTokenizer {
    vocab: HashMap<String, i64>,
    tokens: Vec<String>,
    special_tokens: SpecialTokens,
    capabilities: TokenizerCapabilities,
}

impl ToyTokenizer {
    pub fn new(corpus: &[&str], capabilities: TokenizerCapabilities) -> ToyTokenizer {
        let mut tokens: Vec<String> = ["[PAD]", "[UNK]", "[CLS]", "[SEP]"]
            .iter()
            .map(|token| token.to_string())
            .collect();
        let mut vocab: HashMap<String, i64> = tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id as i64))
            .collect();
        for text in corpus {
            for token in split(text) {
                if !vocab.contains_key(&token) {
                    vocab.insert(token.clone(), tokens.len() as i64);
                    tokens.push(token);
                }
            }
        }
        ToyTokenizer {
            vocab,
            tokens,
            special_tokens: SpecialTokens {
                cls_token: "[CLS]".to_string(),
                cls_token_id: CLS_ID,
                sep_token: "[SEP]".to_string(),
                sep_token_id: SEP_ID,
                pad_token: "[PAD]".to_string(),
                pad_token_id: PAD_ID,
            },
            capabilities,
        }
    }

    pub fn bert_like(corpus: &[&str]) -> ToyTokenizer {
        ToyTokenizer::new(
            corpus,
            TokenizerCapabilities {
                adds_prefix_space: false,
                uses_double_separator: false,
                padding_side: PaddingSide::Right,
            },
        )
    }
}

fn split(text: &str) -> Vec<String> {
    let mut words: Vec<String> = vec![];
    for word in text.to_lowercase().split_whitespace() {
        let mut current = String::new();
        for character in word.chars() {
            if character.is_ascii_punctuation() {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                words.push(character.to_string());
            } else {
                current.push(character);
            }
        }
        if !current.is_empty() {
            words.push(current);
        }
    }

    let mut tokens = vec![];
    for word in words {
        let characters: Vec<char> = word.chars().collect();
        for (index, piece) in characters.chunks(4).enumerate() {
            let piece: String = piece.iter().collect();
            if index == 0 {
                tokens.push(piece);
            } else {
                tokens.push(format!("##{piece}"));
            }
        }
    }
    tokens
}

impl QaTokenizer for ToyTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        split(text)
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<i64> {
        tokens
            .iter()
            .map(|token| *self.vocab.get(token).unwrap_or(&UNK_ID))
            .collect()
    }

    fn convert_ids_to_tokens(&self, ids: &[i64]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                self.tokens
                    .get(*id as usize)
                    .cloned()
                    .unwrap_or_else(|| "[UNK]".to_string())
            })
            .collect()
    }

    fn convert_tokens_to_string(&self, tokens: &[String]) -> String {
        tokens.join(" ").replace(" ##", "").trim().to_string()
    }

    fn special_tokens(&self) -> &SpecialTokens {
        &self.special_tokens
    }

    fn capabilities(&self) -> TokenizerCapabilities {
        self.capabilities
    }
}

/// Builds an evaluation example, the answer being located by its first occurrence in the context
pub fn example(qas_id: &str, question: &str, context: &str, answer: &str) -> QuacExample {
    let is_impossible = answer == "CANNOTANSWER";
    let start_position_character = if is_impossible {
        None
    } else {
        context
            .find(answer)
            .map(|byte_position| context[..byte_position].chars().count())
    };
    QuacExample::new(
        qas_id,
        question,
        context,
        if is_impossible { None } else { Some(answer) },
        start_position_character,
        "title",
        vec![],
        is_impossible,
    )
}
