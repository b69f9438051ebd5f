mod common;

use common::{example, ToyTokenizer, CLS_ID, PAD_ID, SEP_ID};
use rust_quac::pipelines::common::{PaddingSide, QaTokenizer, TokenizerCapabilities};
use rust_quac::pipelines::quac::{
    convert_examples_to_features, improve_answer_span, QuacConfig,
};

const CONTEXT: &str = "The cat sat on the mat";
const QUESTION: &str = "What sat?";

fn config() -> QuacConfig {
    QuacConfig {
        max_seq_length: 24,
        doc_stride: 8,
        max_query_length: 8,
        ..Default::default()
    }
}

#[test]
fn single_window_feature() -> anyhow::Result<()> {
    //    Set-up
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, QUESTION]);
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];

    //    Get features
    let features = convert_examples_to_features(&examples, &tokenizer, &config())?;

    //    Check features
    assert_eq!(features.len(), 1);
    let feature = &features[0];
    // [CLS] what sat ? [SEP] the cat sat on the mat [SEP] [PAD]...
    assert_eq!(feature.input_ids.len(), 24);
    assert_eq!(feature.input_ids[0], CLS_ID);
    assert_eq!(feature.input_ids[4], SEP_ID);
    assert_eq!(feature.input_ids[11], SEP_ID);
    assert!(feature.input_ids[12..].iter().all(|id| *id == PAD_ID));
    assert_eq!(feature.attention_mask.iter().map(|v| *v as i64).sum::<i64>(), 12);
    assert_eq!(feature.token_type_ids[..5], [0; 5]);
    assert_eq!(feature.token_type_ids[5..12], [1; 7]);

    assert_eq!(feature.cls_index, 0);
    assert_eq!(feature.p_mask[0], 0);
    assert_eq!(feature.p_mask[1..5], [1; 4]);
    assert_eq!(feature.p_mask[5..11], [0; 6]);
    assert!(feature.p_mask[11..].iter().all(|v| *v == 1));

    assert_eq!(feature.paragraph_len, 6);
    assert_eq!(feature.query_end, 5);
    assert_eq!(feature.example_index, 0);
    assert_eq!(feature.unique_id, 1_000_000_000);
    assert_eq!(feature.qas_id, "d_q#0");
    assert_eq!(feature.tokens.len(), feature.input_ids.len());

    assert!(!feature.is_impossible);
    assert_eq!(feature.start_position, 6);
    assert_eq!(feature.end_position, 6);
    let answer_tokens = &feature.tokens[feature.start_position..=feature.end_position];
    assert_eq!(tokenizer.convert_tokens_to_string(answer_tokens), "cat");
    assert_eq!(feature.token_to_orig_map[&6], 1);
    assert_eq!(feature.token_to_orig_map.len(), 6);
    assert!(feature.token_is_max_context.values().all(|is_max| *is_max));
    Ok(())
}

#[test]
fn answer_span_is_narrowed_to_sub_tokens() -> anyhow::Result<()> {
    //    Set-up
    let context = "He lived (1895-1943).";
    let question = "When?";
    let tokenizer = ToyTokenizer::bert_like(&[context, question]);
    let examples = vec![example("d_q#0", question, context, "1895")];

    //    Get features
    let features = convert_examples_to_features(&examples, &tokenizer, &config())?;

    //    Check features
    let feature = &features[0];
    assert_eq!(feature.start_position, feature.end_position);
    assert_eq!(feature.tokens[feature.start_position], "1895");
    assert_eq!(feature.token_to_orig_map[&feature.start_position], 2);
    Ok(())
}

#[test]
fn improve_answer_span_falls_back_to_input_span() {
    let tokenizer = ToyTokenizer::bert_like(&["the xylophone (1895-1943)"]);
    let doc_tokens = tokenizer.tokenize("the xylophone (1895-1943)");
    // the, xylo, ##phon, ##e, (, 1895, -, 1943, )
    assert_eq!(improve_answer_span(&doc_tokens, 4, 8, &tokenizer, "1943"), (7, 7));
    assert_eq!(
        improve_answer_span(&doc_tokens, 1, 3, &tokenizer, "xylophone"),
        (1, 3)
    );
    assert_eq!(improve_answer_span(&doc_tokens, 0, 3, &tokenizer, "piano"), (0, 3));
}

#[test]
fn long_context_is_split_in_overlapping_windows() -> anyhow::Result<()> {
    //    Set-up
    let context = (0..30)
        .map(|index| format!("w{index}"))
        .collect::<Vec<String>>()
        .join(" ");
    let question = "q?";
    let tokenizer = ToyTokenizer::bert_like(&[context.as_str(), question]);
    let examples = vec![example("d_q#0", question, &context, "w25")];
    let config = QuacConfig {
        max_seq_length: 16,
        doc_stride: 4,
        max_query_length: 4,
        ..Default::default()
    };

    //    Get features
    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;

    //    Check features
    // 11 context tokens per window, windows starting at 0, 4, 8, 12, 16 and 20
    assert_eq!(features.len(), 6);
    let paragraph_lengths: Vec<usize> = features.iter().map(|f| f.paragraph_len).collect();
    assert_eq!(paragraph_lengths, vec![11, 11, 11, 11, 11, 10]);
    for (index, feature) in features.iter().enumerate() {
        assert_eq!(feature.unique_id, 1_000_000_000 + index);
        assert_eq!(feature.example_index, 0);
        assert_eq!(feature.input_ids.len(), 16);
    }

    for feature in &features[..4] {
        assert!(feature.is_impossible);
        assert_eq!(feature.start_position, feature.cls_index);
        assert_eq!(feature.end_position, feature.cls_index);
    }
    assert!(!features[4].is_impossible);
    assert_eq!(features[4].start_position, 25 - 16 + 4);
    assert!(!features[5].is_impossible);
    assert_eq!(features[5].start_position, 25 - 20 + 4);
    assert_eq!(features[5].tokens[features[5].start_position], "w25");

    // every context token has exactly one max context window
    let starts = [0usize, 4, 8, 12, 16, 20];
    for doc_token in 0..30 {
        let owners = features
            .iter()
            .zip(starts.iter())
            .filter(|(feature, start)| {
                doc_token >= **start
                    && doc_token < **start + feature.paragraph_len
                    && feature.token_is_max_context[&(doc_token - **start + 4)]
            })
            .count();
        assert_eq!(owners, 1, "token {doc_token}");
    }
    Ok(())
}

#[test]
fn left_padded_layout() -> anyhow::Result<()> {
    //    Set-up
    let tokenizer = ToyTokenizer::new(
        &[CONTEXT, QUESTION],
        TokenizerCapabilities {
            adds_prefix_space: false,
            uses_double_separator: false,
            padding_side: PaddingSide::Left,
        },
    );
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];

    //    Get features
    let features = convert_examples_to_features(&examples, &tokenizer, &config())?;

    //    Check features
    // [PAD]... the cat sat on the mat [SEP] what sat ? [SEP] [CLS]
    let feature = &features[0];
    assert_eq!(feature.input_ids.len(), 24);
    assert!(feature.input_ids[..12].iter().all(|id| *id == PAD_ID));
    assert_eq!(feature.attention_mask[..12], [0; 12]);
    assert_eq!(feature.attention_mask[12..], [1; 12]);
    assert_eq!(feature.cls_index, 23);
    assert_eq!(feature.input_ids[23], CLS_ID);
    assert_eq!(feature.token_type_ids[23], 2);
    assert_eq!(feature.input_ids[18], SEP_ID);
    assert_eq!(feature.input_ids[22], SEP_ID);

    assert_eq!(feature.p_mask[12..18], [0; 6]);
    assert_eq!(feature.p_mask[18..23], [1; 5]);
    assert_eq!(feature.p_mask[23], 0);

    assert_eq!(feature.start_position, 13);
    assert_eq!(feature.tokens[13], "cat");
    assert_eq!(feature.token_to_orig_map[&13], 1);
    Ok(())
}

#[test]
fn double_separator_layout() -> anyhow::Result<()> {
    //    Set-up
    let tokenizer = ToyTokenizer::new(
        &[CONTEXT, QUESTION],
        TokenizerCapabilities {
            adds_prefix_space: true,
            uses_double_separator: true,
            padding_side: PaddingSide::Right,
        },
    );
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];

    //    Get features
    let features = convert_examples_to_features(&examples, &tokenizer, &config())?;

    //    Check features
    // [CLS] what sat ? [SEP] [SEP] the cat sat on the mat [SEP]
    let feature = &features[0];
    assert_eq!(feature.input_ids[4], SEP_ID);
    assert_eq!(feature.input_ids[5], SEP_ID);
    assert_eq!(feature.input_ids[12], SEP_ID);
    assert_eq!(feature.query_end, 6);
    assert_eq!(feature.start_position, 7);
    assert_eq!(feature.p_mask[4..6], [1; 2]);
    Ok(())
}

#[test]
fn left_padded_double_separator_layout() -> anyhow::Result<()> {
    //    Set-up
    let tokenizer = ToyTokenizer::new(
        &[CONTEXT, QUESTION],
        TokenizerCapabilities {
            adds_prefix_space: true,
            uses_double_separator: true,
            padding_side: PaddingSide::Left,
        },
    );
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];

    //    Get features
    let features = convert_examples_to_features(&examples, &tokenizer, &config())?;

    //    Check features
    // [PAD]... the cat sat on the mat [SEP] [SEP] what sat ? [SEP] [CLS]
    let feature = &features[0];
    assert_eq!(feature.input_ids.len(), 24);
    assert!(feature.input_ids[..11].iter().all(|id| *id == PAD_ID));
    assert_eq!(feature.attention_mask[..11], [0; 11]);
    assert_eq!(feature.attention_mask[11..], [1; 13]);
    let separators = feature.input_ids.iter().filter(|id| **id == SEP_ID).count();
    assert_eq!(separators, 3);
    assert_eq!(feature.input_ids[17], SEP_ID);
    assert_eq!(feature.input_ids[18], SEP_ID);
    assert_eq!(feature.input_ids[22], SEP_ID);
    assert_eq!(feature.token_type_ids[17..19], [0; 2]);
    assert_eq!(feature.token_type_ids[19..23], [1; 4]);
    assert_eq!(feature.cls_index, 23);
    assert_eq!(feature.query_end, 6);
    assert_eq!(feature.start_position, 12);
    assert_eq!(feature.tokens[12], "cat");
    assert_eq!(feature.token_to_orig_map[&11], 0);
    assert_eq!(feature.p_mask[11..17], [0; 6]);
    assert_eq!(feature.p_mask[17..23], [1; 6]);
    Ok(())
}

#[test]
fn impossible_and_multiple_examples() -> anyhow::Result<()> {
    //    Set-up
    let other_context = "Paris is the capital of France";
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, QUESTION, other_context, "Which city?"]);
    let examples = vec![
        example("d_q#0", QUESTION, CONTEXT, "cat"),
        example("d_q#1", "Which city?", CONTEXT, "CANNOTANSWER"),
        example("e_q#0", "Which city?", other_context, "Paris"),
    ];
    let config = QuacConfig {
        threads: 2,
        ..config()
    };

    //    Get features
    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;

    //    Check features
    assert_eq!(features.len(), 3);
    for (index, feature) in features.iter().enumerate() {
        assert_eq!(feature.example_index, index);
        assert_eq!(feature.unique_id, 1_000_000_000 + index);
        assert_eq!(feature.qas_id, examples[index].qas_id);
    }
    assert!(features[1].is_impossible);
    assert_eq!(features[1].start_position, 0);
    assert_eq!(features[1].end_position, 0);
    assert!(!features[2].is_impossible);
    assert_eq!(features[2].tokens[features[2].start_position], "pari");
    assert_eq!(features[2].tokens[features[2].end_position], "##s");
    Ok(())
}

#[test]
fn long_questions_are_truncated() -> anyhow::Result<()> {
    let question = "What did the cat do on the mat?";
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, question]);
    let examples = vec![example("d_q#0", question, CONTEXT, "sat")];
    let config = QuacConfig {
        max_query_length: 2,
        ..config()
    };

    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;

    assert_eq!(features[0].query_end, 4);
    assert_eq!(features[0].input_ids[3], SEP_ID);
    assert_eq!(features[0].tokens[features[0].start_position], "sat");
    Ok(())
}

#[test]
fn invalid_configuration() {
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, QUESTION]);
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];

    let invalid = QuacConfig {
        max_query_length: 22,
        ..config()
    };
    assert!(convert_examples_to_features(&examples, &tokenizer, &invalid).is_err());

    let invalid = QuacConfig {
        doc_stride: 0,
        ..config()
    };
    assert!(convert_examples_to_features(&examples, &tokenizer, &invalid).is_err());

    let invalid = QuacConfig {
        threads: 0,
        ..config()
    };
    assert!(convert_examples_to_features(&examples, &tokenizer, &invalid).is_err());
}
