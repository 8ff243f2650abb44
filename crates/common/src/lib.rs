//! Core of apkshelf: the metadata index kept next to uploaded APKs and the
//! operations that keep files and metadata in step.

pub mod index;
pub mod shelf;
pub mod version;

pub mod prelude {
    pub use crate::index::{
        DownloadCounts, IndexConfig, IndexError, MetadataIndex, ShortLinkEntry, ShortLinks,
    };
    pub use crate::shelf::{
        DeleteError, FileView, Job, JobDispatcher, ReconcileError, ReconcileOptions,
        ReconcileReport, Shelf, ShelfConfig, UploadError,
    };
    pub use crate::version::BuildInfo;
}
