//! Docker-backed image store and export engine.
//!
//! Drives a Docker daemon through `docktopus`' bollard client. Docker has no
//! native namespaces, so daemon-managed images carry the owning namespace in
//! the `stevedore.namespace` label; resolution filters on that label plus
//! the requested reference.

use std::collections::HashMap;

use async_trait::async_trait;
use docktopus::DockerBuilder;
use docktopus::bollard::image::ListImagesOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell as AsyncOnceCell;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::api_types::Platform;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::export::{ArchiveSink, ExportEngine};
use crate::store::{ImageRecord, ImageStore, Namespace};

/// Label carrying the owning namespace on daemon-managed images.
pub const NAMESPACE_LABEL: &str = "stevedore.namespace";

static DOCKER_BUILDER: AsyncOnceCell<DockerBuilder> = AsyncOnceCell::const_new();

/// Connect to Docker once and reuse the client for every request.
pub async fn docker_builder() -> Result<&'static DockerBuilder> {
    DOCKER_BUILDER
        .get_or_try_init(|| async {
            let config = DaemonConfig::load();
            let builder = match config.docker_host.as_deref() {
                Some(host) => DockerBuilder::with_address(host).await.map_err(|err| {
                    DaemonError::Docker(format!("Failed to connect to docker at {host}: {err}"))
                })?,
                None => DockerBuilder::new().await.map_err(|err| {
                    DaemonError::Docker(format!("Failed to connect to docker: {err}"))
                })?,
            };
            Ok(builder)
        })
        .await
}

fn search_filters(namespace: &Namespace, name: &str) -> HashMap<String, Vec<String>> {
    HashMap::from([
        ("reference".to_string(), vec![name.to_string()]),
        (
            "label".to_string(),
            vec![format!("{NAMESPACE_LABEL}={namespace}")],
        ),
    ])
}

/// Image store backed by the local Docker daemon.
pub struct DockerImageStore;

#[async_trait]
impl ImageStore for DockerImageStore {
    async fn search(&self, namespace: &Namespace, name: &str) -> Result<Vec<ImageRecord>> {
        let builder = docker_builder().await?;
        let options = ListImagesOptions::<String> {
            filters: search_filters(namespace, name),
            ..Default::default()
        };
        let summaries = builder
            .client()
            .list_images(Some(options))
            .await
            .map_err(|err| DaemonError::Storage(format!("image lookup failed: {err}")))?;

        Ok(summaries
            .into_iter()
            .map(|summary| {
                let name = summary
                    .repo_tags
                    .first()
                    .cloned()
                    .unwrap_or_else(|| summary.id.clone());
                ImageRecord {
                    name,
                    digest: summary.repo_digests.first().cloned(),
                }
            })
            .collect())
    }
}

/// Export engine backed by the Docker daemon's `/images/get` endpoint.
pub struct DockerExportEngine;

#[async_trait]
impl ExportEngine for DockerExportEngine {
    async fn export_archive(
        &self,
        _namespace: &Namespace,
        images: &[ImageRecord],
        platform: Option<&Platform>,
        sink: &mut ArchiveSink,
    ) -> Result<()> {
        if platform.is_some() {
            // /images/get takes no platform parameter; the filter is advisory.
            debug!("docker export backend ignores the platform filter; exporting all platforms");
        }
        let builder = docker_builder().await?;
        let names: Vec<&str> = images.iter().map(|image| image.name.as_str()).collect();
        let archive = builder.client().export_images(&names);
        tokio::pin!(archive);
        while let Some(chunk) = archive.next().await {
            let chunk = chunk
                .map_err(|err| DaemonError::Export(format!("archive stream failed: {err}")))?;
            sink.write_all(&chunk)
                .await
                .map_err(|err| DaemonError::Export(format!("archive write failed: {err}")))?;
        }
        sink.flush()
            .await
            .map_err(|err| DaemonError::Export(format!("archive flush failed: {err}")))?;
        Ok(())
    }
}
