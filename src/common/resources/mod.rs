//! # Resource definitions for vocabularies, merges files and datasets
//!
//! This crate relies on the concept of Resources to access the files used by the pipelines.
//! This includes:
//! - vocabularies
//! - (optional) merges files for BPE-based tokenizers
//! - QuAC dataset files
//!
//! The local location of the file can be retrieved using `get_local_path`, allowing to
//! reference the resource file location regardless of how it is provided.

mod local;

use crate::common::error::QuacError;
pub use local::LocalResource;
use std::path::PathBuf;

/// # Resource Trait that can provide the location of the vocabulary, merges or dataset resources
pub trait ResourceProvider {
    /// Provides the local path for a resource.
    ///
    /// # Returns
    ///
    /// * `PathBuf` pointing to the resource file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_quac::resources::{LocalResource, ResourceProvider};
    /// use std::path::PathBuf;
    /// let vocab_resource = LocalResource {
    ///     local_path: PathBuf::from("path/to/vocab.txt"),
    /// };
    /// let vocab_path = vocab_resource.get_local_path();
    /// ```
    fn get_local_path(&self) -> Result<PathBuf, QuacError>;
}
