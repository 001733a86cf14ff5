//! Image store abstraction: namespace-scoped name resolution.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

/// Isolation boundary partitioning images within the daemon.
///
/// Configured once per daemon instance and injected into every component
/// that touches the store; it never varies within a request's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A concrete stored image produced by name resolution.
///
/// Resolution produces a record that is consumed once by the export call;
/// nothing is cached or retained across requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    /// Fully-qualified reference (`repository:tag` or `repository@digest`).
    pub name: String,
    /// Content digest, when the backend reports one.
    pub digest: Option<String>,
}

/// Backend that maps a human-supplied image name to stored image records.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Return every image matching `name` within `namespace`.
    ///
    /// An empty vec means "nothing matched" and is not an error. Name
    /// uniqueness within a namespace is this store's contract; callers do
    /// not disambiguate multiple matches.
    async fn search(&self, namespace: &Namespace, name: &str) -> Result<Vec<ImageRecord>>;
}
