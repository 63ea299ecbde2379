//! `entsync_shared`
//!
//! Types shared by the entity sync client and whatever hosts it.
//!
//! Design goals:
//! - Deterministic where practical; time comes from a `Clock`.
//! - Message intents are plain data; transports live elsewhere.
//! - No `unsafe`.

pub mod config;
pub mod control;
pub mod math;
pub mod net;
pub mod time;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::control::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::time::*;
}
