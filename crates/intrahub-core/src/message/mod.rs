//! Message store.
//!
//! Durable record of ingested messages, keyed per account by the provider's
//! message identifier and queryable by account and folder.

mod model;
mod repository;

pub use model::{Folder, IngestedMessage, MessageId, NewMessage};
pub use repository::MessageRepository;
