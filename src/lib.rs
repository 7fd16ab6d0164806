//! Tooling for the welfare-exam question bank: cleaning scraped text,
//! normalizing category labels, merging snapshots without duplicates, and
//! cutting the master file into the bundles the app ships.
//!
//! Everything works on JSON arrays of question objects. Records are kept as
//! [`serde_json::Value`] so unknown fields and both field spellings survive a
//! round trip; [`record::Question`] is the canonical typed form.

pub mod assets;
pub mod category;
pub mod census;
pub mod clean;
pub mod dedup;
pub mod env;
pub mod error;
pub mod explain;
pub mod jsonio;
pub mod logging;
pub mod record;

pub use error::DataError;
pub use record::Question;
