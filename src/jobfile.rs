//! Job parameter files
//!
//! `.toml` files are parsed as TOML, everything else as JSON. Both carry the
//! same document: a `framework` tag plus that framework's settings.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use submit_params::{JobParameters, ParamError};

use crate::config::toml_to_json;

#[derive(Debug, thiserror::Error)]
pub enum JobFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid job parameters in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParamError,
    },
}

/// Load job parameters, choosing the format by file extension
pub fn load(path: &Path) -> Result<JobParameters, JobFileError> {
    let contents = fs::read_to_string(path).map_err(|source| JobFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let parsed = if is_toml {
        parse_toml(&contents)
    } else {
        JobParameters::from_json_str(&contents)
    };
    parsed.map_err(|source| JobFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_toml(contents: &str) -> Result<JobParameters, ParamError> {
    let value: toml::Value =
        toml::from_str(contents).map_err(|e| ParamError::Parse(e.to_string()))?;
    serde_json::from_value(toml_to_json(value)).map_err(|e| ParamError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use submit_params::Framework;

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        fs::write(
            &path,
            r#"
framework = "tensorflow"
name = "mnist"
num_workers = 2
worker_launch_cmd = "python train.py"
worker_resource = "memory=4G,vcores=2"
"#,
        )
        .unwrap();

        let params = load(&path).unwrap();
        assert_eq!(params.framework(), Framework::TensorFlow);
        assert_eq!(params.common().name, "mnist");
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        fs::write(
            &path,
            r#"{"framework": "pytorch", "name": "bert", "worker_launch_cmd": "python run.py"}"#,
        )
        .unwrap();

        assert_eq!(load(&path).unwrap().framework(), Framework::PyTorch);
    }

    #[test]
    fn test_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load(&missing), Err(JobFileError::Read { .. })));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "framework = \"mxnet\"\nname = \"x\"\n").unwrap();
        let err = load(&bad).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
