//! Launcher-process submission client
//!
//! Runs an external launcher (a TonY-style cluster submitter) as a child
//! process. The launcher logs the application id once the resource manager
//! accepts the job and then keeps monitoring until the application ends, so
//! the child lives as long as the cluster application does.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{ClientError, CompletionNotifier, SubmissionClient};
use crate::appid::ApplicationId;
use crate::sync::lock;

/// Argument introducing the materialized configuration file
pub const CONF_FILE_ARG: &str = "--conf_file";

/// Launcher and kill command configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessClientConfig {
    /// Launcher executable
    pub program: String,
    /// Arguments placed before the initialization args
    pub args: Vec<String>,
    /// Executable used to kill a cluster application
    pub kill_program: String,
    /// Arguments placed before the application id
    pub kill_args: Vec<String>,
}

impl Default for ProcessClientConfig {
    fn default() -> Self {
        Self {
            program: "tony-cli".to_string(),
            args: Vec::new(),
            kill_program: "yarn".to_string(),
            kill_args: vec!["application".to_string(), "-kill".to_string()],
        }
    }
}

/// Submission client backed by an external launcher process
pub struct ProcessClient {
    config: ProcessClientConfig,
    init_args: Mutex<Option<Vec<String>>>,
    child: Mutex<Option<Child>>,
    application_id: Mutex<Option<ApplicationId>>,
}

impl ProcessClient {
    pub fn new(config: ProcessClientConfig) -> Self {
        Self {
            config,
            init_args: Mutex::new(None),
            child: Mutex::new(None),
            application_id: Mutex::new(None),
        }
    }

    /// Last application id seen in the launcher output
    pub fn application_id(&self) -> Option<ApplicationId> {
        *lock(&self.application_id)
    }

    fn launch(&self, notifier: &dyn CompletionNotifier) -> Result<(), ClientError> {
        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args);
        match lock(&self.init_args).as_ref() {
            Some(args) => {
                command.args(args);
            }
            None => warn!("launching without initialization arguments"),
        }

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ClientError::Launch(format!("failed to spawn '{}': {}", self.config.program, e))
            })?;
        info!(program = %self.config.program, pid = child.id(), "launcher started");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        *lock(&self.child) = Some(child);

        std::thread::scope(|scope| {
            if let Some(stderr) = stderr {
                scope.spawn(move || self.scan_output("stderr", stderr, notifier));
            }
            if let Some(stdout) = stdout {
                self.scan_output("stdout", stdout, notifier);
            }
        });

        // Both streams are closed: the launcher has exited or is exiting
        let child = lock(&self.child).take();
        if let Some(mut child) = child {
            let status = child.wait()?;
            if status.success() {
                info!(%status, "launcher exited");
            } else {
                warn!(%status, "launcher exited unsuccessfully");
            }
        }
        Ok(())
    }

    fn scan_output(&self, stream: &str, output: impl Read, notifier: &dyn CompletionNotifier) {
        for line in BufReader::new(output).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(stream, error = %e, "stopped reading launcher output");
                    break;
                }
            };
            debug!(stream, "{}", line);

            if let Some(id) = ApplicationId::find_in(&line) {
                let is_new = {
                    let mut known = lock(&self.application_id);
                    let is_new = *known != Some(id);
                    *known = Some(id);
                    is_new
                };
                // Launchers repeat the id in every status report
                if is_new {
                    info!(application_id = %id, "resource manager assigned application id");
                    notifier.on_identifier_received(id);
                }
            }
        }
    }

    fn kill_local_launcher(&self) -> Result<(), ClientError> {
        let mut guard = lock(&self.child);
        if let Some(child) = guard.as_mut() {
            if child.try_wait()?.is_none() {
                info!(pid = child.id(), "killing launcher process");
                child.kill()?;
            }
        }
        Ok(())
    }

    fn kill_application(&self, id: ApplicationId) -> Result<(), ClientError> {
        info!(application_id = %id, program = %self.config.kill_program, "killing cluster application");
        let output = Command::new(&self.config.kill_program)
            .args(&self.config.kill_args)
            .arg(id.to_string())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                ClientError::ResourceManager(format!(
                    "failed to run '{}': {}",
                    self.config.kill_program, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClientError::ResourceManager(format!(
                "kill of {} exited with {}: {}",
                id,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl SubmissionClient for ProcessClient {
    fn initialize(&self, args: &[String]) -> Result<(), ClientError> {
        let conf_file = args
            .iter()
            .position(|a| a == CONF_FILE_ARG)
            .and_then(|i| args.get(i + 1))
            .ok_or_else(|| {
                ClientError::Initialization(format!("missing {} argument", CONF_FILE_ARG))
            })?;

        if !Path::new(conf_file).is_file() {
            return Err(ClientError::Initialization(format!(
                "configuration file {} does not exist",
                conf_file
            )));
        }

        *lock(&self.init_args) = Some(args.to_vec());
        Ok(())
    }

    fn start(&self, notifier: &dyn CompletionNotifier) {
        if let Err(e) = self.launch(notifier) {
            error!(error = %e, "submission client stopped");
        }
    }

    fn force_terminate(&self) -> Result<(), ClientError> {
        // The launcher goes last: once it dies the worker ends
        let cluster = match self.application_id() {
            Some(id) => self.kill_application(id),
            None => {
                debug!("no application id recorded, nothing to kill on the cluster");
                Ok(())
            }
        };
        let local = self.kill_local_launcher();
        cluster.and(local)
    }
}
