//! Document models stored in MongoDB.
//!
//! Field names are camelCase so documents written by earlier versions of
//! the service deserialize unchanged.

pub mod channel;
pub mod note;
pub mod user;

pub use channel::{Channel, ChannelMember};
pub use note::{Note, NoteMetadata};
pub use user::{OneTimeCode, SecurityQuestions, User};
