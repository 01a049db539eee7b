//! Domain models exchanged with webhook callers.

pub mod report;
pub mod response;
