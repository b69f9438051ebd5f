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

use std::cmp::min;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// # Window over the sub-word tokens of a context
pub struct DocSpan {
    /// Position of the first sub-word token of the window
    pub start: usize,
    /// Number of sub-word tokens in the window
    pub length: usize,
}

impl DocSpan {
    /// Position of the last sub-word token of the window
    pub fn end(&self) -> usize {
        self.start + self.length - 1
    }

    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.start + self.length
    }
}

/// Slides a window of `capacity` tokens with stride `doc_stride` over `num_doc_tokens` tokens.
///
/// Windows start at `k * doc_stride` and the last window is the first one reaching the end of the
/// document, so that a document fitting in `capacity` tokens yields a single window. Returns no
/// window for an empty document or a null capacity or stride.
pub fn compute_doc_spans(
    num_doc_tokens: usize,
    capacity: usize,
    doc_stride: usize,
) -> Vec<DocSpan> {
    let mut doc_spans = Vec::new();
    if capacity == 0 || doc_stride == 0 {
        return doc_spans;
    }
    let mut start = 0;
    while start < num_doc_tokens {
        let length = min(num_doc_tokens - start, capacity);
        doc_spans.push(DocSpan { start, length });
        if start + length >= num_doc_tokens {
            break;
        }
        start += doc_stride;
    }
    doc_spans
}

/// Checks if the window `doc_spans[current_span_index]` is the window giving the most context to
/// the token at `position`.
///
/// The score of a window is `min(left context, right context) + 0.01 * window length`: this is an
/// empirical heuristic, kept exactly to preserve output compatibility. The first window reaching the
/// best score wins.
pub fn is_max_context(doc_spans: &[DocSpan], current_span_index: usize, position: usize) -> bool {
    let mut best_score: Option<f64> = None;
    let mut best_span_index = None;
    for (span_index, doc_span) in doc_spans.iter().enumerate() {
        if !doc_span.contains(position) {
            continue;
        }
        let num_left_context = position - doc_span.start;
        let num_right_context = doc_span.end() - position;
        let score =
            min(num_left_context, num_right_context) as f64 + 0.01 * doc_span.length as f64;
        if best_score.map_or(true, |best_score| score > best_score) {
            best_score = Some(score);
            best_span_index = Some(span_index);
        }
    }
    best_span_index == Some(current_span_index)
}
