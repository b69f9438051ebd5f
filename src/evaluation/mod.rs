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

//! # QuAC evaluation
//! Word-level F1 of predicted answers against several human references, following the official
//! QuAC metric:
//! - references are cleaned with `handle_cannot` (`CANNOTANSWER` if at least half of the
//! annotators found no answer),
//! - questions on which the annotators disagree (leave-one-out human F1 below 0.4) are skipped,
//! - a prediction is scored with `leave_one_out_max` against the remaining references.
//!
//! ```no_run
//! use rust_quac::evaluation::{quac_performance, read_predictions, read_target_dict};
//! # fn main() -> anyhow::Result<()> {
//! let predictions = read_predictions("predictions.json")?;
//! let target_dict = read_target_dict("path/to/quac/dev.json")?;
//! let f1 = quac_performance(&predictions, &target_dict)?;
//! println!("F1: {:.2}", f1);
//! # Ok(())
//! # }
//! ```

mod metrics;
mod performance;

pub use metrics::{
    f1_score, handle_cannot, leave_one_out, leave_one_out_max, normalize_answer, single_score,
};
pub use performance::{
    quac_performance, quac_performance_excluding_cannot_answer, read_predictions,
    read_target_dict, read_target_dict_excluding_cannot_answer, MIN_HUMAN_F1,
};
