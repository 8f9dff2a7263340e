//! Cache module - typed TTL caches backed by Moka.
//!
//! Repositories own their caches directly:
//!
//! ```rust,ignore
//! let by_email: TypedCache<String, User> =
//!     TypedCache::new("users_by_email", CacheConfig::lookup());
//! let seen = by_email.generation();
//! // ... read the user from MongoDB ...
//! by_email.fill(user.email.clone(), user, seen);
//! ```

mod config;
mod typed;

pub use config::CacheConfig;
pub use typed::TypedCache;
