use kernel_memory_addresses::{PageSize, UnknownGranule};

/// Reasons a page-table walk can fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PmapError {
    /// The requested page size is not a granule this MMU supports.
    #[error("unknown page granule")]
    UnknownGranule,
    /// A table on the path is missing and allocation was not requested.
    #[error("no translation table at level {level}")]
    NoLevel { level: u8 },
    /// A leaf sits at a level where no page size can ever match it.
    #[error("page size not implemented at this level")]
    UnimplementedSize,
    /// A mapping of a different size is in the way.
    #[error("page size mismatch: found a {0} mapping")]
    UnmatchedSize(PageSize),
    /// No frame was available for a new intermediate table.
    #[error("out of memory (translation table)")]
    OutOfMemory,
}

impl From<UnknownGranule> for PmapError {
    fn from(_: UnknownGranule) -> Self {
        Self::UnknownGranule
    }
}
