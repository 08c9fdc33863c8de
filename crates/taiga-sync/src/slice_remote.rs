use tracing::debug;

use taiga_types::Branch;

use crate::error::{SyncError, SyncResult};
use crate::remote::{FetchOutcome, PushReport, Remote, SyncEndpoint};

/// The generic remote: any [`SyncEndpoint`] driven through whole slices.
///
/// This is the fallback every backend gets for free. Protocol adapters
/// with want/have negotiation can replace it where transfer size
/// matters.
pub struct SliceRemote<E> {
    endpoint: E,
}

impl<E: SyncEndpoint> SliceRemote<E> {
    /// Wrap a remote endpoint.
    pub fn new(endpoint: E) -> Self {
        Self { endpoint }
    }

    /// The wrapped endpoint.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }
}

impl<E: SyncEndpoint> Remote for SliceRemote<E> {
    fn fetch(
        &self,
        local: &dyn SyncEndpoint,
        branch: &Branch,
        depth: Option<u64>,
    ) -> SyncResult<FetchOutcome> {
        let Some((head, slice)) = self.endpoint.export_branch(branch, depth)? else {
            return Ok(FetchOutcome::NoHead);
        };
        let objects_received = local.import_objects(&slice)?;
        debug!(branch = %branch, head = %head.short_hex(), objects_received, "fetched");
        Ok(FetchOutcome::Head {
            head,
            objects_received,
        })
    }

    fn push(
        &self,
        local: &dyn SyncEndpoint,
        branch: &Branch,
        depth: Option<u64>,
    ) -> SyncResult<PushReport> {
        let Some((head, slice)) = local.export_branch(branch, depth)? else {
            return Err(SyncError::NoHead(branch.as_str().to_string()));
        };
        let objects_sent = slice.len();
        self.endpoint.publish(branch, head, &slice)?;
        debug!(branch = %branch, head = %head.short_hex(), objects_sent, "pushed");
        Ok(PushReport { head, objects_sent })
    }
}
