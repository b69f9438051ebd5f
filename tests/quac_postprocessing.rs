mod common;

use common::{example, ToyTokenizer};
use rust_quac::pipelines::quac::{
    compute_predictions_logits, convert_examples_to_features, QuacConfig, QuacFeature, QuacResult,
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

fn result(feature: &QuacFeature, start: &[(usize, f64)], end: &[(usize, f64)]) -> QuacResult {
    let mut start_logits = vec![0f64; feature.input_ids.len()];
    let mut end_logits = vec![0f64; feature.input_ids.len()];
    for (position, logit) in start {
        start_logits[*position] = *logit;
    }
    for (position, logit) in end {
        end_logits[*position] = *logit;
    }
    QuacResult {
        unique_id: feature.unique_id,
        start_logits,
        end_logits,
        class_logit: None,
    }
}

#[test]
fn predicts_best_span() -> anyhow::Result<()> {
    //    Set-up
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, QUESTION]);
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];
    let config = config();
    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;
    let position = features[0].start_position;
    let results = vec![result(
        &features[0],
        &[(position, 10.0)],
        &[(position, 10.0)],
    )];

    //    Get predictions
    let predictions =
        compute_predictions_logits(&examples, &features, &results, &tokenizer, &config)?;

    //    Check predictions
    assert_eq!(predictions.len(), 1);
    let prediction = &predictions[0];
    assert_eq!(prediction.qas_id, "d_q#0");
    assert_eq!(prediction.answer, "cat");
    assert!(prediction.null_score_diff < config.null_score_diff_threshold);
    assert!((prediction.null_score_diff + 20.0).abs() < 1e-9);

    let best = &prediction.nbest[0];
    assert_eq!(best.text, "cat");
    assert_eq!(best.answer_start, 4);
    assert_eq!(best.start_logit + best.end_logit, 20.0);

    assert!(prediction.nbest.len() <= config.n_best_size + 1);
    assert!(prediction
        .nbest
        .iter()
        .any(|entry| entry.text == "CANNOTANSWER"));
    let mut texts: Vec<&str> = prediction.nbest.iter().map(|e| e.text.as_str()).collect();
    texts.sort_unstable();
    texts.dedup();
    assert_eq!(texts.len(), prediction.nbest.len());
    let total_probability: f64 = prediction.nbest.iter().map(|e| e.probability).sum();
    assert!((total_probability - 1.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn null_dominant_prediction() -> anyhow::Result<()> {
    //    Set-up
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, QUESTION]);
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];
    let config = config();
    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;
    let position = features[0].start_position;
    let results = vec![result(
        &features[0],
        &[(0, 10.0), (position, 5.0)],
        &[(0, 10.0), (position, 5.0)],
    )];

    //    Get predictions
    let predictions =
        compute_predictions_logits(&examples, &features, &results, &tokenizer, &config)?;

    //    Check predictions
    let prediction = &predictions[0];
    assert_eq!(prediction.answer, "CANNOTANSWER");
    assert!((prediction.null_score_diff - 10.0).abs() < 1e-9);
    assert_eq!(prediction.nbest[0].text, "CANNOTANSWER");
    assert_eq!(prediction.nbest[0].answer_start, -1);
    assert_eq!(prediction.nbest[1].text, "cat");
    Ok(())
}

#[test]
fn threshold_controls_null_prediction() -> anyhow::Result<()> {
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, QUESTION]);
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];
    let config = QuacConfig {
        null_score_diff_threshold: -25.0,
        ..config()
    };
    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;
    let position = features[0].start_position;
    let results = vec![result(
        &features[0],
        &[(position, 10.0)],
        &[(position, 10.0)],
    )];

    let predictions =
        compute_predictions_logits(&examples, &features, &results, &tokenizer, &config)?;

    assert_eq!(predictions[0].answer, "CANNOTANSWER");
    assert_eq!(predictions[0].nbest[0].text, "cat");
    Ok(())
}

#[test]
fn predictions_across_windows() -> anyhow::Result<()> {
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
    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;
    assert_eq!(features.len(), 6);

    // w25 is scored in the two windows covering it, the last one giving it the most context
    let results: Vec<QuacResult> = features
        .iter()
        .enumerate()
        .map(|(index, feature)| match index {
            4 => result(feature, &[(13, 8.0)], &[(13, 8.0)]),
            5 => result(feature, &[(9, 10.0)], &[(9, 10.0)]),
            _ => result(feature, &[], &[]),
        })
        .collect();

    //    Get predictions
    let predictions =
        compute_predictions_logits(&examples, &features, &results, &tokenizer, &config)?;

    //    Check predictions
    assert_eq!(predictions[0].answer, "w25");
    assert_eq!(predictions[0].nbest[0].start_logit, 10.0);
    Ok(())
}

#[test]
fn example_without_features() -> anyhow::Result<()> {
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, QUESTION]);
    let examples = vec![
        example("d_q#0", QUESTION, CONTEXT, "cat"),
        example("d_q#1", QUESTION, "", "CANNOTANSWER"),
    ];
    let config = config();
    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;
    assert_eq!(features.len(), 1);
    let results = vec![result(&features[0], &[(6, 10.0)], &[(6, 10.0)])];

    let predictions =
        compute_predictions_logits(&examples, &features, &results, &tokenizer, &config)?;

    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[1].qas_id, "d_q#1");
    assert_eq!(predictions[1].answer, "CANNOTANSWER");
    assert_eq!(predictions[1].null_score_diff, 10.0);
    assert_eq!(predictions[1].nbest.len(), 1);
    assert_eq!(predictions[1].nbest[0].probability, 1.0);
    Ok(())
}

#[test]
fn missing_or_duplicate_results() -> anyhow::Result<()> {
    let tokenizer = ToyTokenizer::bert_like(&[CONTEXT, QUESTION]);
    let examples = vec![example("d_q#0", QUESTION, CONTEXT, "cat")];
    let config = config();
    let features = convert_examples_to_features(&examples, &tokenizer, &config)?;

    assert!(compute_predictions_logits(&examples, &features, &[], &tokenizer, &config).is_err());

    let results = vec![
        result(&features[0], &[], &[]),
        result(&features[0], &[], &[]),
    ];
    assert!(
        compute_predictions_logits(&examples, &features, &results, &tokenizer, &config).is_err()
    );
    Ok(())
}
