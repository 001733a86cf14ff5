//! Export coordination: name resolution and archive streaming.
//!
//! Per request the flow is strictly resolve-then-stream: no archive bytes
//! are produced until resolution has succeeded, so callers can commit
//! response headers on the outcome of [`ImageExportService::resolve`] alone.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::api_types::Platform;
use crate::error::{DaemonError, Result};
use crate::metrics::metrics;
use crate::store::{ImageRecord, ImageStore, Namespace};

/// Writable byte sink the export engine streams the archive into.
///
/// Open for the full duration of the export; closing it (dropping the
/// concrete writer) signals end-of-archive to the consumer.
pub type ArchiveSink = dyn AsyncWrite + Send + Unpin;

/// External engine that serializes resolved images into an OCI-compatible
/// tar archive, writing directly and incrementally into the sink.
#[async_trait]
pub trait ExportEngine: Send + Sync {
    /// `images` is never empty. An error may surface after partial bytes
    /// have already been written; callers treat that as unrecoverable.
    async fn export_archive(
        &self,
        namespace: &Namespace,
        images: &[ImageRecord],
        platform: Option<&Platform>,
        sink: &mut ArchiveSink,
    ) -> Result<()>;
}

/// Coordinates name resolution and archive export for one namespace.
///
/// The namespace is an explicit constructor argument rather than ambient
/// state, so each instance is independently configurable and testable by
/// substituting the store and engine collaborators.
pub struct ImageExportService {
    namespace: Namespace,
    store: Arc<dyn ImageStore>,
    engine: Arc<dyn ExportEngine>,
}

impl ImageExportService {
    pub fn new(
        namespace: Namespace,
        store: Arc<dyn ImageStore>,
        engine: Arc<dyn ExportEngine>,
    ) -> Self {
        Self {
            namespace,
            store,
            engine,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Resolve `name` to the single matching image in the namespace.
    ///
    /// Zero matches is the only condition distinguished from generic
    /// failure; uniqueness within a namespace is the store's contract, so
    /// the first record returned is the resolution.
    pub async fn resolve(&self, name: &str) -> Result<ImageRecord> {
        let mut matches = self.store.search(&self.namespace, name).await?;
        if matches.is_empty() {
            metrics().record_not_found();
            return Err(DaemonError::NotFound(format!("no such image: {name}")));
        }
        Ok(matches.swap_remove(0))
    }

    /// Stream the archive for an already-resolved image into `sink`.
    ///
    /// Engine errors propagate verbatim. There are no retries: the sink may
    /// already hold partial archive bytes that cannot be unsent.
    pub async fn write_archive(
        &self,
        image: ImageRecord,
        platform: Option<&Platform>,
        sink: &mut ArchiveSink,
    ) -> Result<()> {
        metrics().record_export_started();
        let result = self
            .engine
            .export_archive(&self.namespace, &[image], platform, sink)
            .await;
        match &result {
            Ok(()) => metrics().record_export_completed(),
            Err(_) => metrics().record_export_failed(),
        }
        result
    }

    /// Resolve `name` and stream its archive into `sink` in one call.
    pub async fn export(
        &self,
        name: &str,
        platform: Option<&Platform>,
        sink: &mut ArchiveSink,
    ) -> Result<()> {
        let image = self.resolve(name).await?;
        self.write_archive(image, platform, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tokio::io::AsyncWriteExt;

    struct StaticStore {
        records: Vec<ImageRecord>,
    }

    #[async_trait]
    impl ImageStore for StaticStore {
        async fn search(&self, _namespace: &Namespace, name: &str) -> Result<Vec<ImageRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|record| record.name == name)
                .cloned()
                .collect())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ImageStore for FailingStore {
        async fn search(&self, _namespace: &Namespace, _name: &str) -> Result<Vec<ImageRecord>> {
            Err(DaemonError::Storage("store unavailable".into()))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct SeenCall {
        namespace: String,
        images: Vec<ImageRecord>,
        platform: Option<Platform>,
    }

    struct RecordingEngine {
        payload: &'static [u8],
        fail: Option<&'static str>,
        calls: Mutex<Vec<SeenCall>>,
    }

    impl RecordingEngine {
        fn writing(payload: &'static [u8]) -> Self {
            Self {
                payload,
                fail: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &'static str) -> Self {
            Self {
                payload: b"",
                fail: Some(message),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExportEngine for RecordingEngine {
        async fn export_archive(
            &self,
            namespace: &Namespace,
            images: &[ImageRecord],
            platform: Option<&Platform>,
            sink: &mut ArchiveSink,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(SeenCall {
                namespace: namespace.as_str().to_string(),
                images: images.to_vec(),
                platform: platform.cloned(),
            });
            if let Some(message) = self.fail {
                return Err(DaemonError::Export(message.into()));
            }
            sink.write_all(self.payload)
                .await
                .map_err(|err| DaemonError::Export(err.to_string()))?;
            Ok(())
        }
    }

    fn record(name: &str) -> ImageRecord {
        ImageRecord {
            name: name.to_string(),
            digest: None,
        }
    }

    fn service(store: Arc<dyn ImageStore>, engine: Arc<dyn ExportEngine>) -> ImageExportService {
        ImageExportService::new(Namespace::new("test-ns"), store, engine)
    }

    #[tokio::test]
    async fn export_streams_archive_for_single_match() {
        let engine = Arc::new(RecordingEngine::writing(b"tar-bytes"));
        let svc = service(
            Arc::new(StaticStore {
                records: vec![record("test-image")],
            }),
            engine.clone(),
        );

        let mut sink = Cursor::new(Vec::new());
        svc.export("test-image", None, &mut sink).await.unwrap();

        assert_eq!(sink.into_inner(), b"tar-bytes");
        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].namespace, "test-ns");
        assert_eq!(calls[0].images, vec![record("test-image")]);
        assert_eq!(calls[0].platform, None);
    }

    #[tokio::test]
    async fn export_fails_not_found_when_nothing_matches() {
        let engine = Arc::new(RecordingEngine::writing(b"tar-bytes"));
        let svc = service(Arc::new(StaticStore { records: vec![] }), engine.clone());

        let mut sink = Cursor::new(Vec::new());
        let err = svc
            .export("missing-image", None, &mut sink)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("no such image: missing-image"));
        assert!(engine.calls.lock().unwrap().is_empty());
        assert!(sink.into_inner().is_empty());
    }

    #[tokio::test]
    async fn export_propagates_store_failure() {
        let engine = Arc::new(RecordingEngine::writing(b""));
        let svc = service(Arc::new(FailingStore), engine.clone());

        let mut sink = Cursor::new(Vec::new());
        let err = svc.export("test-image", None, &mut sink).await.unwrap_err();

        assert!(!err.is_not_found());
        assert!(matches!(err, DaemonError::Storage(_)));
        assert!(engine.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn export_propagates_engine_error_verbatim() {
        let engine = Arc::new(RecordingEngine::failing("layer blob vanished"));
        let svc = service(
            Arc::new(StaticStore {
                records: vec![record("test-image")],
            }),
            engine,
        );

        let mut sink = Cursor::new(Vec::new());
        let err = svc.export("test-image", None, &mut sink).await.unwrap_err();

        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "export error: layer blob vanished");
    }

    #[tokio::test]
    async fn platform_filter_is_forwarded_unchanged() {
        let engine = Arc::new(RecordingEngine::writing(b"tar-bytes"));
        let svc = service(
            Arc::new(StaticStore {
                records: vec![record("test-image")],
            }),
            engine.clone(),
        );

        let platform = Platform {
            os: Some("linux".into()),
            architecture: Some("arm64".into()),
            variant: Some("v8".into()),
        };
        let mut sink = Cursor::new(Vec::new());
        svc.export("test-image", Some(&platform), &mut sink)
            .await
            .unwrap();

        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls[0].platform, Some(platform));
    }

    #[tokio::test]
    async fn resolve_returns_the_single_matching_record() {
        let svc = service(
            Arc::new(StaticStore {
                records: vec![record("test-image"), record("other-image")],
            }),
            Arc::new(RecordingEngine::writing(b"")),
        );

        let image = svc.resolve("test-image").await.unwrap();
        assert_eq!(image, record("test-image"));
    }
}
