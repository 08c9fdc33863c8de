//! Remote synchronisation for the taiga data store.
//!
//! Wire protocols are external collaborators; what lives here is the
//! contract they implement ([`Remote`]) and the generic fallback
//! ([`SliceRemote`]) that synchronises any two endpoints through slice
//! export/import, correct for every backend if not the most
//! bandwidth-frugal.

pub mod error;
pub mod remote;
pub mod slice_remote;

pub use error::{SyncError, SyncResult};
pub use remote::{FetchOutcome, PushReport, Remote, SyncEndpoint};
pub use slice_remote::SliceRemote;
