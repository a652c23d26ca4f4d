//! Reference database synchronisation against the NCBI BLAST database
//! listing: metadata discovery, checksum-verified archive downloads and
//! extraction into per-database directories.

pub mod disk;
pub mod metadata;
pub mod registry;
pub mod transport;
pub mod updater;

pub use metadata::{parse_metadata, RemoteDatabase};
pub use registry::RemoteRegistry;
pub use transport::{HttpTransport, Transport};
pub use updater::{DatabaseSync, UpdateSummary};
