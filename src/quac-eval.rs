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

use rust_quac::evaluation::{
    quac_performance, quac_performance_excluding_cannot_answer, read_predictions,
    read_target_dict, read_target_dict_excluding_cannot_answer,
};
use rust_quac::resources::{LocalResource, ResourceProvider};
use rust_quac::QuacError;
use std::path::PathBuf;

pub fn main() -> Result<(), QuacError> {
    env_logger::init();

    let args: Vec<_> = std::env::args().collect();
    let exclude_cannot_answer = args.iter().any(|arg| arg == "--exclude-cannot-answer");
    let paths: Vec<&String> = args
        .iter()
        .skip(1)
        .filter(|arg| !arg.starts_with("--"))
        .collect();
    assert_eq!(
        paths.len(),
        2,
        "usage: {} predictions.json dev.json [--exclude-cannot-answer]",
        args[0].as_str()
    );

    let predictions_path = LocalResource::from(PathBuf::from(paths[0])).get_local_path()?;
    let gold_path = LocalResource::from(PathBuf::from(paths[1])).get_local_path()?;
    let predictions = read_predictions(predictions_path)?;

    if exclude_cannot_answer {
        let target_dict = read_target_dict_excluding_cannot_answer(gold_path)?;
        let (f1, num_gold_cannot_answer, num_total) =
            quac_performance_excluding_cannot_answer(&predictions, &target_dict)?;
        println!("F1: {:.2}", f1);
        println!(
            "Excluded {} of {} questions with a CANNOTANSWER reference",
            num_gold_cannot_answer, num_total
        );
    } else {
        let target_dict = read_target_dict(gold_path)?;
        let f1 = quac_performance(&predictions, &target_dict)?;
        println!("F1: {:.2}", f1);
    }
    Ok(())
}
