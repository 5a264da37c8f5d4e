//! bollard-backed [`ContainerEngine`]

use std::collections::HashMap;

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::service::{HostConfig, PortBinding};
use futures::StreamExt;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::{ContainerDescriptor, ContainerEngine, HOST_PORT};
use crate::error::{MeowError, Result};
use crate::install::progress::ProgressSink;

/// A connection to the local Docker daemon.
///
/// The connection is released when the value is dropped.
pub struct DockerEngine {
    docker: Docker,
    cancel: CancellationToken,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform's default socket
    pub fn connect(cancel: CancellationToken) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        debug!("opened container engine connection");
        Ok(Self::with_docker(docker, cancel))
    }

    /// Wrap an already configured bollard client
    pub fn with_docker(docker: Docker, cancel: CancellationToken) -> Self {
        Self { docker, cancel }
    }
}

impl Drop for DockerEngine {
    fn drop(&mut self) {
        debug!("closed container engine connection");
    }
}

/// Split `name:tag` into its parts; a missing tag means `latest`.
///
/// A colon that belongs to a registry port (`host:5000/name`) is not a tag separator.
/// Digest references (`name@sha256:...`) are passed through whole with an empty tag.
pub fn split_image_ref(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

/// bollard create request for `descriptor`: image, three binds, one port binding
pub fn container_config(descriptor: &ContainerDescriptor) -> Config<String> {
    let port = descriptor.port_key();

    let host_config = HostConfig {
        binds: Some(descriptor.binds()),
        port_bindings: Some(HashMap::from([(
            port.clone(),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(HOST_PORT.to_string()),
            }]),
        )])),
        ..Default::default()
    };

    Config {
        image: Some(descriptor.image.clone()),
        tty: Some(false),
        exposed_ports: Some(HashMap::from([(port, HashMap::new())])),
        host_config: Some(host_config),
        ..Default::default()
    }
}

impl ContainerEngine for DockerEngine {
    async fn pull_image(&self, image: &str, sink: Option<&dyn ProgressSink>) -> Result<()> {
        let (from_image, tag) = split_image_ref(image);
        debug!("pulling image {image}");

        let options = CreateImageOptions {
            from_image,
            tag,
            ..Default::default()
        };
        let mut events = self.docker.create_image(Some(options), None, None);

        if let Some(sink) = sink {
            sink.on_start(0);
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(MeowError::Cancelled),
                next = events.next() => match next {
                    Some(event) => event?,
                    None => break,
                },
            };

            if let Some(status) = &event.status {
                debug!("pull {image}: {status}");
            }
            if let Some(sink) = sink {
                match serde_json::to_vec(&event) {
                    Ok(mut line) => {
                        line.push(b'\n');
                        sink.on_transfer(0, &line);
                    }
                    Err(e) => warn!("could not encode pull event: {e}"),
                }
            }
        }

        if let Some(sink) = sink {
            sink.on_finish();
        }
        Ok(())
    }

    async fn start_container(&self, descriptor: &ContainerDescriptor) -> Result<i64> {
        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: descriptor.name.clone(),
                    platform: None,
                }),
                container_config(descriptor),
            )
            .await?;
        for warning in &created.warnings {
            warn!("create {}: {}", descriptor.name, warning);
        }
        debug!("created container {} ({})", descriptor.name, created.id);

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await?;
        debug!("started container {}", descriptor.name);

        let mut wait = self.docker.wait_container(
            &created.id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(MeowError::Cancelled),
            outcome = wait.next() => outcome,
        };

        match outcome {
            Some(Ok(response)) => Ok(response.status_code),
            Some(Err(e)) => Err(e.into()),
            None => Err(bollard::errors::Error::DockerStreamError {
                error: format!("wait stream for {} ended without a status", descriptor.name),
            }
            .into()),
        }
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        self.docker.stop_container(name, None).await?;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    v: false,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn cat_descriptor() -> ContainerDescriptor {
        ContainerDescriptor {
            name: "cat".to_string(),
            image: "cheshire-cat-ai:1.0".to_string(),
            plugins_dir: PathBuf::from("/host/p"),
            data_dir: PathBuf::from("/host/d"),
            static_dir: PathBuf::from("/host/s"),
            port: 80,
        }
    }

    #[test]
    fn image_refs() {
        assert_eq!(split_image_ref("cheshire-cat-ai:1.0"), ("cheshire-cat-ai", "1.0"));
        assert_eq!(split_image_ref("cheshire-cat-ai"), ("cheshire-cat-ai", "latest"));
        assert_eq!(
            split_image_ref("localhost:5000/cheshire-cat-ai"),
            ("localhost:5000/cheshire-cat-ai", "latest")
        );
        assert_eq!(
            split_image_ref("ghcr.io/cheshire-cat-ai/core:1.7.1"),
            ("ghcr.io/cheshire-cat-ai/core", "1.7.1")
        );
    }

    #[test]
    fn digest_refs_are_not_split() {
        assert_eq!(
            split_image_ref("cheshire-cat-ai@sha256:abc123"),
            ("cheshire-cat-ai@sha256:abc123", "")
        );
        assert_eq!(
            split_image_ref("localhost:5000/core:1.0@sha256:abc123"),
            ("localhost:5000/core:1.0@sha256:abc123", "")
        );
    }

    #[test]
    fn create_request_has_three_binds_and_one_port() {
        let config = container_config(&cat_descriptor());

        assert_eq!(config.image.as_deref(), Some("cheshire-cat-ai:1.0"));
        let exposed = config.exposed_ports.unwrap();
        assert_eq!(exposed.len(), 1);
        assert!(exposed.contains_key("80/tcp"));

        let host = config.host_config.unwrap();
        assert_eq!(
            host.binds.unwrap(),
            vec![
                "/host/p:/app/cat/plugins",
                "/host/d:/app/cat/data",
                "/host/s:/app/cat/static",
            ]
        );

        let ports = host.port_bindings.unwrap();
        assert_eq!(ports.len(), 1);
        let bindings = ports["80/tcp"].as_ref().unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].host_port.as_deref(), Some("80"));
    }
}
