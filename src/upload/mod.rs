//! Upload workflow: validate, store, record, reward, notify.

mod file_type;
mod rate_limit;
mod workflow;

pub use file_type::FileType;
pub use rate_limit::{COOLDOWN, RateLimitGate};
pub use workflow::{
    MAX_FILE_SIZE, UploadError, UploadReceipt, UploadRequest, UploadService, UploadedFile,
    storage_name,
};
