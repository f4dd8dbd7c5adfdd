//! Admin messaging flow: project grouping -> channel -> message list, with
//! optimistic sends and realtime updates.

pub mod config;
pub mod entry;
pub mod error;
pub mod grouping;
pub mod messages;
pub mod page;
pub mod queries;
pub mod realtime;
pub mod selection;
pub mod view;

pub use config::{ChatConfig, SelfEchoPolicy};
pub use entry::{MessageEntry, TempId};
pub use error::{ChatError, SendRejected};
pub use messages::MessageList;
pub use page::MessagingPage;
pub use selection::SelectionState;
pub use view::{LoadState, ViewEffect};
