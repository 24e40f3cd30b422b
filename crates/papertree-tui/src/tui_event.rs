use papertree_core::{Decoded, StreamOutcome};

/// Events flowing from a search task to the TUI.
///
/// Every event carries the generation of the search that produced it so the
/// app can drop events from a search it has already replaced.
#[derive(Debug)]
pub enum BackendEvent {
    /// One decoded (or undecodable) stream record.
    Record { generation: u64, item: Decoded },
    /// The stream ended; `Err` holds the failure message.
    Finished {
        generation: u64,
        result: Result<StreamOutcome, String>,
    },
}

impl BackendEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Record { generation, .. } | Self::Finished { generation, .. } => *generation,
        }
    }
}
