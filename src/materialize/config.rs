//! Launcher configuration derived from job parameters.

use std::collections::BTreeMap;

use submit_params::{Resource, TensorFlowParameters};

use super::xml;

/// Configuration keys understood by the launcher
pub mod keys {
    pub const APPLICATION_NAME: &str = "tony.application.name";
    pub const YARN_QUEUE: &str = "tony.yarn.queue";
    pub const DOCKER_ENABLED: &str = "tony.docker.enabled";
    pub const DOCKER_IMAGE: &str = "tony.docker.containers.image";
    pub const CONTAINER_ENVS: &str = "tony.containers.envs";
    pub const EXECUTION_ENVS: &str = "tony.execution.envs";
    pub const CONTAINER_RESOURCES: &str = "tony.containers.resources";
    pub const SECURITY_ENABLED: &str = "tony.application.security.enabled";

    pub const WORKER_JOB: &str = "worker";
    pub const PS_JOB: &str = "ps";
    pub const TENSORBOARD_JOB: &str = "tensorboard";

    pub fn instances(job: &str) -> String {
        format!("tony.{}.instances", job)
    }

    pub fn memory(job: &str) -> String {
        format!("tony.{}.memory", job)
    }

    pub fn vcores(job: &str) -> String {
        format!("tony.{}.vcores", job)
    }

    pub fn gpus(job: &str) -> String {
        format!("tony.{}.gpus", job)
    }

    pub fn command(job: &str) -> String {
        format!("tony.{}.command", job)
    }
}

/// Environment prefix that only applies to the container runtime
const DOCKER_ENV_PREFIX: &str = "DOCKER_";

/// Ordered key/value overrides handed to the launcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionConfig {
    properties: BTreeMap<String, String>,
}

impl SubmissionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build the launcher configuration for a TensorFlow job
    pub fn from_tensorflow(params: &TensorFlowParameters) -> Self {
        let common = &params.common;
        let mut config = Self::new();

        config.set(keys::APPLICATION_NAME, common.name.as_str());
        config.set(keys::instances(keys::WORKER_JOB), params.num_workers.to_string());
        config.set(keys::instances(keys::PS_JOB), params.num_ps.to_string());

        if let Some(resource) = params.worker_resource {
            config.set_resource(keys::WORKER_JOB, resource);
        }
        if let Some(resource) = params.ps_resource {
            config.set_resource(keys::PS_JOB, resource);
        }
        if params.tensorboard {
            config.set(keys::instances(keys::TENSORBOARD_JOB), "1");
            if let Some(resource) = params.tensorboard_resource {
                config.set_resource(keys::TENSORBOARD_JOB, resource);
            }
        }

        if let Some(queue) = &common.queue {
            config.set(keys::YARN_QUEUE, queue.as_str());
        }
        if let Some(image) = &common.docker_image {
            config.set(keys::DOCKER_ENABLED, "true");
            config.set(keys::DOCKER_IMAGE, image.as_str());
        }

        if !common.envs.is_empty() {
            config.set(keys::CONTAINER_ENVS, common.envs.join(","));
            let execution: Vec<String> = common
                .envs
                .iter()
                .map(|env| env.strip_prefix(DOCKER_ENV_PREFIX).unwrap_or(env).to_string())
                .collect();
            config.set(keys::EXECUTION_ENVS, execution.join(","));
        }

        if let Some(cmd) = &params.worker_launch_cmd {
            config.set(keys::command(keys::WORKER_JOB), cmd.as_str());
        }
        if let Some(cmd) = &params.ps_launch_cmd {
            config.set(keys::command(keys::PS_JOB), cmd.as_str());
        }

        config.set(
            keys::SECURITY_ENABLED,
            (!common.security_disabled).to_string(),
        );

        if !common.localizations.is_empty() {
            let resources: Vec<String> = common
                .localizations
                .iter()
                .map(|l| format!("{}::{}", l.remote_uri, l.local_path))
                .collect();
            config.set(keys::CONTAINER_RESOURCES, resources.join(","));
        }

        // User overrides win over everything derived above
        for pair in &common.conf_pairs {
            config.set(pair.key.as_str(), pair.value.as_str());
        }

        config
    }

    fn set_resource(&mut self, job: &str, resource: Resource) {
        self.set(keys::memory(job), format!("{}m", resource.memory_mb));
        self.set(keys::vcores(job), resource.vcores.to_string());
        if resource.gpus > 0 {
            self.set(keys::gpus(job), resource.gpus.to_string());
        }
    }

    /// Render as a Hadoop-style configuration document
    pub fn to_xml(&self) -> String {
        xml::render(self.iter())
    }
}
