//! Cheshire Cat container lifecycle on top of a container engine
//!
//! [`ContainerEngine`] is the capability the rest of the crate talks to;
//! [`DockerEngine`] implements it with bollard.

mod client;

use std::future::Future;
use std::path::PathBuf;

use log::info;

pub use client::{DockerEngine, container_config, split_image_ref};

use crate::config::CatSettings;
use crate::error::Result;
use crate::install::progress::ProgressSink;

pub const CONTAINER_PLUGINS_DIR: &str = "/app/cat/plugins";
pub const CONTAINER_DATA_DIR: &str = "/app/cat/data";
pub const CONTAINER_STATIC_DIR: &str = "/app/cat/static";

/// The container port is always published here
pub const HOST_PORT: &str = "80";

/// Parameters used to create the cat container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub name: String,
    pub image: String,
    pub plugins_dir: PathBuf,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Container TCP port bound to [`HOST_PORT`]
    pub port: u16,
}

impl ContainerDescriptor {
    pub fn from_settings(cat: &CatSettings) -> Self {
        Self {
            name: cat.container_name.clone(),
            image: cat.image_ref(),
            plugins_dir: cat.plugins_dir.clone(),
            data_dir: cat.data_dir.clone(),
            static_dir: cat.static_dir.clone(),
            port: cat.port,
        }
    }

    /// `host:container` bind specs, plugins then data then static
    pub fn binds(&self) -> Vec<String> {
        [
            (&self.plugins_dir, CONTAINER_PLUGINS_DIR),
            (&self.data_dir, CONTAINER_DATA_DIR),
            (&self.static_dir, CONTAINER_STATIC_DIR),
        ]
        .into_iter()
        .map(|(host, container)| format!("{}:{}", host.display(), container))
        .collect()
    }

    pub fn port_key(&self) -> String {
        format!("{}/tcp", self.port)
    }
}

/// Minimal engine surface needed to manage one container
pub trait ContainerEngine {
    /// Pull `image` (`name:tag`), streaming status events to `sink`
    fn pull_image(
        &self,
        image: &str,
        sink: Option<&dyn ProgressSink>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Create and start the container, then wait until it stops running.
    ///
    /// Resolves to the container's exit status code.
    fn start_container(
        &self,
        descriptor: &ContainerDescriptor,
    ) -> impl Future<Output = Result<i64>> + Send;

    fn stop_container(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Force-remove the container, keeping its volumes
    fn remove_container(&self, name: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Pull the configured image and run the cat until its container exits
pub async fn run_cat<E: ContainerEngine>(
    engine: &E,
    cat: &CatSettings,
    sink: Option<&dyn ProgressSink>,
) -> Result<i64> {
    let descriptor = ContainerDescriptor::from_settings(cat);

    for dir in [
        &descriptor.plugins_dir,
        &descriptor.data_dir,
        &descriptor.static_dir,
    ] {
        tokio::fs::create_dir_all(dir).await?;
    }

    info!("Pulling image {}", descriptor.image);
    engine.pull_image(&descriptor.image, sink).await?;

    info!(
        "Starting container {} (port {} -> host {})",
        descriptor.name, descriptor.port, HOST_PORT
    );
    let exit_code = engine.start_container(&descriptor).await?;
    info!("Container {} exited with code {}", descriptor.name, exit_code);
    Ok(exit_code)
}
