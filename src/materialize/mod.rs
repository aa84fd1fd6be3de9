//! Configuration materialization
//!
//! Turns validated job parameters into the launcher's configuration document
//! and persists it where the submission client can read it:
//! 1. [`SubmissionConfig::from_tensorflow`] derives the key/value overrides
//! 2. [`SubmissionConfig::to_xml`] renders a Hadoop-style configuration document
//! 3. [`FileMaterializer`] writes it to a uniquely named transient file

mod config;
mod xml;

pub use config::{keys, SubmissionConfig};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use submit_params::TensorFlowParameters;
use tracing::{debug, info, warn};

use crate::client::CONF_FILE_ARG;

/// Default file name suffix, the name the launcher localizes
pub const DEFAULT_SUFFIX: &str = "tony-final.xml";

/// Materialization errors
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("failed to create {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A configuration document persisted for one submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedConfig {
    pub path: PathBuf,
    /// SHA-256 of the written document
    pub sha256: String,
    pub property_count: usize,
}

impl MaterializedConfig {
    /// Arguments handing this configuration to a submission client
    pub fn client_args(&self) -> Vec<String> {
        vec![
            CONF_FILE_ARG.to_string(),
            self.path.to_string_lossy().into_owned(),
        ]
    }

    /// Remove the file; a file that is already gone is not an error
    pub fn discard(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Produces the configuration artifact for a submission attempt
pub trait Materializer: Send + Sync {
    fn materialize(&self, params: &TensorFlowParameters)
        -> Result<MaterializedConfig, MaterializeError>;
}

/// Writes configuration documents into a directory
#[derive(Debug, Clone)]
pub struct FileMaterializer {
    dir: PathBuf,
    suffix: String,
}

impl FileMaterializer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unique_path(&self) -> PathBuf {
        self.dir
            .join(format!("temp-{}-{}", uuid::Uuid::new_v4().simple(), self.suffix))
    }

    fn write_new(path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }
}

impl Materializer for FileMaterializer {
    fn materialize(
        &self,
        params: &TensorFlowParameters,
    ) -> Result<MaterializedConfig, MaterializeError> {
        let config = SubmissionConfig::from_tensorflow(params);
        let document = config.to_xml();
        let path = self.unique_path();

        if let Err(source) = Self::write_new(&path, document.as_bytes()) {
            // Leave nothing half-written behind for the launcher to pick up
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to remove partial configuration");
                }
            }
            return Err(MaterializeError::Write { path, source });
        }

        let sha256 = hex::encode(Sha256::digest(document.as_bytes()));
        debug!(properties = config.len(), "{}", document);
        info!(path = %path.display(), %sha256, "wrote launcher configuration");

        Ok(MaterializedConfig {
            path,
            sha256,
            property_count: config.len(),
        })
    }
}
