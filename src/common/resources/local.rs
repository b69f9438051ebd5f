use crate::common::error::QuacError;
use crate::resources::ResourceProvider;
use std::path::PathBuf;

/// # Local resource
#[derive(PartialEq, Clone, Debug)]
pub struct LocalResource {
    /// Local path for the resource
    pub local_path: PathBuf,
}

impl ResourceProvider for LocalResource {
    /// Gets the path for a local resource, failing if the file does not exist.
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
    /// let dataset_resource = LocalResource {
    ///     local_path: PathBuf::from("path/to/dev.json"),
    /// };
    /// let dataset_path = dataset_resource.get_local_path();
    /// ```
    fn get_local_path(&self) -> Result<PathBuf, QuacError> {
        if !self.local_path.is_file() {
            return Err(QuacError::IOError(format!(
                "Resource file not found: {}",
                self.local_path.display()
            )));
        }
        Ok(self.local_path.clone())
    }
}

impl From<PathBuf> for LocalResource {
    fn from(local_path: PathBuf) -> Self {
        Self { local_path }
    }
}
