// Copyright 2019 Guillaume Becquin
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
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// # Utility to deserialize JSON config files
pub trait Config
where
    for<'de> Self: Deserialize<'de>,
{
    /// Loads a `Config` object from a JSON file. The format is expected to be aligned with the
    /// serde field names of the implementing type, missing optional fields taking their defaults.
    ///
    /// # Parameters
    /// * `path` - `Path` to the configuration JSON file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_quac::pipelines::quac::QuacConfig;
    /// use rust_quac::Config;
    /// use std::path::Path;
    ///
    /// let config_path = Path::new("path/to/quac_config.json");
    /// let config = QuacConfig::from_file(config_path);
    /// ```
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QuacError> {
        let f = File::open(path.as_ref()).map_err(|e| {
            QuacError::IOError(format!(
                "Could not open configuration file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let br = BufReader::new(f);
        let config: Self = serde_json::from_reader(br).map_err(|e| {
            QuacError::InvalidConfigurationError(format!("Could not parse configuration: {e}"))
        })?;
        Ok(config)
    }
}
