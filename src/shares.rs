//! Disk-share correlation.
//!
//! A separate inventory subsystem knows which storage repositories are
//! shared/mounted volumes rather than local storage, keyed by the SR label
//! `VHD-<sr-uuid>`. The pipeline consults that lookup per disk; presence
//! reclassifies the disk as a share. This module only defines the seam and
//! two trivial resolvers - actual share discovery belongs to the caller.

use std::future::Future;

use indexmap::IndexMap;

use crate::error::Result;
use crate::session::XeSession;

/// Share details for one storage repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareInfo {
    /// World Wide Name of the shared volume.
    pub serial: String,
    /// Mount size in MiB.
    pub size_mib: u64,
}

/// Shares keyed by storage-repository label (`VHD-<sr-uuid>`).
pub type ShareMap = IndexMap<String, ShareInfo>;

/// The label under which a storage repository appears in the share lookup.
pub fn share_label(sr_uuid: &str) -> String {
    format!("VHD-{}", sr_uuid)
}

/// Resolver for the disk-share lookup, given the open scan session.
pub trait ShareResolver: Send + Sync {
    fn resolve(
        &self,
        session: &mut (impl XeSession + Send),
    ) -> impl Future<Output = Result<ShareMap>> + Send;
}

/// Default resolver: no storage repository is a share.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShares;

impl ShareResolver for NoShares {
    async fn resolve(&self, _session: &mut (impl XeSession + Send)) -> Result<ShareMap> {
        Ok(ShareMap::new())
    }
}

/// Resolver wrapping a precomputed share map, for orchestrators that already
/// ran share discovery on this host.
#[derive(Debug, Clone, Default)]
pub struct StaticShares(pub ShareMap);

impl ShareResolver for StaticShares {
    async fn resolve(&self, _session: &mut (impl XeSession + Send)) -> Result<ShareMap> {
        Ok(self.0.clone())
    }
}
