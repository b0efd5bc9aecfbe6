use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
        StartContainerOptions,
    },
    image::CreateImageOptions,
    models::{HostConfig, PortBinding, RestartPolicy as DockerRestartPolicy, RestartPolicyNameEnum},
};
use futures_util::stream::StreamExt;
use tracing::{debug, info, warn};

use super::runtime::ContainerRuntime;
use super::types::{Config, RestartPolicy};
use crate::error::RuntimeError;

/// [`ContainerRuntime`] backed by a Docker engine.
#[derive(Debug, Clone)]
pub struct DockerClient {
    client: Docker,
}

impl DockerClient {
    /// Connects using `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Connect(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Docker) -> Self {
        DockerClient { client }
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        info!(image, "pulling image");

        let mut stream = self.client.create_image(
            Some(CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(msg) = stream.next().await {
            match msg {
                Ok(progress) => {
                    if let Some(status) = progress.status {
                        debug!(image, %status, "pull progress");
                    }
                }
                Err(e) => {
                    return Err(RuntimeError::ImagePull {
                        image: image.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(image, "image pulled");
        Ok(())
    }

    /// Forwards the container's combined output to the log until it closes.
    fn attach_logs(&self, container_id: &str) {
        let client = self.client.clone();
        let container_id = container_id.to_string();

        tokio::spawn(async move {
            let mut stream = client.logs(
                &container_id,
                Some(LogsOptions::<String> {
                    follow: true,
                    stdout: true,
                    stderr: true,
                    ..Default::default()
                }),
            );

            while let Some(item) = stream.next().await {
                match item {
                    Ok(LogOutput::StdErr { message }) => {
                        warn!(target: "container", %container_id, "{}", String::from_utf8_lossy(&message).trim_end());
                    }
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        info!(target: "container", %container_id, "{}", String::from_utf8_lossy(&message).trim_end());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(%container_id, error = %e, "container log stream closed with error");
                        break;
                    }
                }
            }
        });
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn start(&self, config: &Config) -> Result<String, RuntimeError> {
        self.pull_image(&config.image).await?;

        let options = (!config.name.is_empty()).then(|| CreateContainerOptions {
            name: config.name.clone(),
            ..Default::default()
        });

        let created = self
            .client
            .create_container(options, container_config(config))
            .await
            .map_err(|e| RuntimeError::ContainerCreate {
                image: config.image.clone(),
                reason: e.to_string(),
            })?;
        info!(container_id = %created.id, name = %config.name, "container created");

        if let Err(e) = self
            .client
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
        {
            // Do not leave a created-but-never-started container behind.
            let cleanup = self
                .client
                .remove_container(
                    &created.id,
                    Some(RemoveContainerOptions {
                        force: true,
                        v: true,
                        ..Default::default()
                    }),
                )
                .await;
            if let Err(cleanup_err) = cleanup {
                warn!(container_id = %created.id, error = %cleanup_err, "failed to remove unstarted container");
            }

            return Err(RuntimeError::ContainerStart {
                container_id: created.id,
                reason: e.to_string(),
            });
        }

        info!(container_id = %created.id, "container started");
        self.attach_logs(&created.id);

        Ok(created.id)
    }

    async fn stop(&self, container_id: &str) -> Result<(), RuntimeError> {
        if container_id.is_empty() {
            return Err(RuntimeError::MissingContainerId);
        }

        info!(container_id, "stopping container");
        self.client
            .stop_container(container_id, None)
            .await
            .map_err(|e| RuntimeError::ContainerStop {
                container_id: container_id.to_string(),
                reason: e.to_string(),
            })?;

        self.client
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    v: true,
                    force: false,
                    link: false,
                }),
            )
            .await
            .map_err(|e| RuntimeError::ContainerRemove {
                container_id: container_id.to_string(),
                reason: e.to_string(),
            })?;

        info!(container_id, "container stopped and removed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

fn restart_policy(policy: RestartPolicy) -> DockerRestartPolicy {
    let name = match policy {
        RestartPolicy::None => RestartPolicyNameEnum::NO,
        RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
        RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
        RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
    };

    DockerRestartPolicy {
        name: Some(name),
        maximum_retry_count: None,
    }
}

fn port_key(port: &str) -> String {
    if port.contains('/') {
        port.to_string()
    } else {
        format!("{port}/tcp")
    }
}

fn container_config(config: &Config) -> bollard::container::Config<String> {
    let mut exposed_ports: HashMap<String, HashMap<(), ()>> = config
        .exposed_ports
        .iter()
        .map(|port| (format!("{port}/tcp"), HashMap::new()))
        .collect();

    let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = config
        .port_bindings
        .iter()
        .map(|(container_port, host_port)| {
            (
                port_key(container_port),
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(host_port.clone()),
                }]),
            )
        })
        .collect();

    for key in port_bindings.keys() {
        exposed_ports.entry(key.clone()).or_default();
    }

    let host_config = HostConfig {
        restart_policy: Some(restart_policy(config.restart_policy)),
        memory: config.memory,
        publish_all_ports: Some(port_bindings.is_empty()),
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        ..Default::default()
    };

    bollard::container::Config {
        image: Some(config.image.clone()),
        tty: Some(false),
        env: (!config.env.is_empty()).then(|| config.env.clone()),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        host_config: Some(host_config),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_all_ports_without_explicit_bindings() {
        let config = Config {
            name: "web".to_string(),
            image: "strm/helloworld-http".to_string(),
            exposed_ports: vec![80],
            ..Default::default()
        };

        let built = container_config(&config);
        let host = built.host_config.unwrap();

        assert_eq!(host.publish_all_ports, Some(true));
        assert!(host.port_bindings.is_none());
        assert!(built.exposed_ports.unwrap().contains_key("80/tcp"));
        assert!(built.env.is_none());
    }

    #[test]
    fn explicit_bindings_are_exposed_and_bound() {
        let config = Config {
            image: "strm/helloworld-http".to_string(),
            port_bindings: HashMap::from([("80".to_string(), "8080".to_string())]),
            memory: Some(64 * 1024 * 1024),
            restart_policy: RestartPolicy::Always,
            env: vec!["MODE=test".to_string()],
            ..Default::default()
        };

        let built = container_config(&config);
        let host = built.host_config.unwrap();

        assert_eq!(host.publish_all_ports, Some(false));
        assert_eq!(host.memory, Some(64 * 1024 * 1024));
        assert_eq!(
            host.restart_policy.unwrap().name,
            Some(RestartPolicyNameEnum::ALWAYS)
        );
        let binding = &host.port_bindings.unwrap()["80/tcp"];
        assert_eq!(
            binding.as_ref().unwrap()[0].host_port.as_deref(),
            Some("8080")
        );
        assert!(built.exposed_ports.unwrap().contains_key("80/tcp"));
        assert_eq!(built.env, Some(vec!["MODE=test".to_string()]));
    }

    #[test]
    fn port_keys_keep_explicit_protocol() {
        assert_eq!(port_key("53/udp"), "53/udp");
        assert_eq!(port_key("7777"), "7777/tcp");
    }
}
