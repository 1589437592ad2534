//! Domain records of the governance registry together with the request
//! shapes, validation rules, partial-update merging and vote tallying shared
//! by the storage layer and the HTTP service.

pub mod patch;
pub mod tally;
pub mod types;
pub mod validation;
