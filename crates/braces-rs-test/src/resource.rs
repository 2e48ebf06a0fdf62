//! Streaming resources that report how often they were released.
//!
//! ```rust
//! use braces_rs_test::resource::ReleaseProbe;
//!
//! let probe = ReleaseProbe::new();
//! let resource = probe.resource(&b"id,title\n"[..]);
//! # drop(resource);
//! assert_eq!(probe.releases(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use braces_rs_core::{BracesError, BracesResult};
use braces_rs_views::resource::StreamingResource;

/// Counts releases across every resource it hands out.
#[derive(Debug, Clone, Default)]
pub struct ReleaseProbe {
    releases: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl ReleaseProbe {
    /// Creates a probe with zero releases.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resource that reads `data` in full.
    pub fn resource(&self, data: impl Into<Bytes>) -> TrackedResource {
        TrackedResource {
            data: data.into(),
            fail_after: None,
            fail_release: false,
            probe: self.clone(),
        }
    }

    /// A resource whose read fails after `after` bytes.
    pub fn failing_resource(&self, data: impl Into<Bytes>, after: usize) -> TrackedResource {
        TrackedResource {
            fail_after: Some(after),
            ..self.resource(data)
        }
    }

    /// Number of releases so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Number of reads so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// A [`StreamingResource`] over in-memory bytes, tracked by a
/// [`ReleaseProbe`].
#[derive(Debug)]
pub struct TrackedResource {
    data: Bytes,
    fail_after: Option<usize>,
    fail_release: bool,
    probe: ReleaseProbe,
}

impl TrackedResource {
    /// Makes `release` fail (after counting the release).
    #[must_use]
    pub const fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }
}

#[async_trait]
impl StreamingResource for TrackedResource {
    async fn read_to_end(&mut self) -> BracesResult<Bytes> {
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        match self.fail_after {
            Some(after) if after < self.data.len() => Err(BracesError::Resource(format!(
                "stream interrupted after {after} of {} bytes",
                self.data.len()
            ))),
            _ => Ok(self.data.clone()),
        }
    }

    async fn release(self: Box<Self>) -> BracesResult<()> {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            Err(BracesError::Resource("release failed".to_string()))
        } else {
            Ok(())
        }
    }
}
