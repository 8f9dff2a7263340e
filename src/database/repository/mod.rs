//! MongoDB implementations of the store traits.

mod channel_repository;
mod note_repository;
mod user_repository;

pub use channel_repository::ChannelRepository;
pub use note_repository::NoteRepository;
pub use user_repository::UserRepository;
