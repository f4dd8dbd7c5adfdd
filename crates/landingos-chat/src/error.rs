use thiserror::Error;

use landingos_backend::BackendError;
use landingos_types::records::RecordError;

/// Reasons a send is refused before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error("message text is empty")]
    EmptyText,

    #[error("no channel selected")]
    NoChannel,

    #[error("a send is already in flight")]
    InFlight,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Rejected(#[from] SendRejected),

    #[error("backend call failed: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("channel name must not be blank")]
    BlankChannelName,

    #[error("no project grouping selected")]
    NoGrouping,

    #[error("the default channel cannot be deleted")]
    DefaultChannelLocked,

    #[error("channel {0} is not in the current list")]
    UnknownChannel(uuid::Uuid),
}
