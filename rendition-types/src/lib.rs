//! Rendition Types
//!
//! Shared type definitions for the rendition ladder engine: quality labels,
//! lifecycle statuses, probed media descriptions, persisted records and the
//! reports produced by pipeline and batch runs.

pub mod error;
pub mod media;
pub mod quality;
pub mod records;
pub mod reports;

pub use error::*;
pub use media::*;
pub use quality::*;
pub use records::*;
pub use reports::*;
