//! Request signing and callback verification for WeChat Pay API V3.
//!
//! Outbound material (payment invocations, API requests) is signed with the
//! merchant's RSA private key. Inbound callbacks are verified against the
//! gateway's rotating platform keys, resolved by serial number through a
//! lazily populated [`KeyCache`].

pub mod callback;
pub mod fetcher;
pub mod key_cache;
pub mod key_set;
pub mod keys;
pub mod message;
pub mod signing;

pub use callback::*;
pub use fetcher::*;
pub use key_cache::*;
pub use key_set::*;
pub use keys::*;
pub use message::*;
pub use signing::*;
