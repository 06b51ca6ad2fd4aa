//! `orglink-linkage`: organization record linkage engine.
//!
//! Pure engine crate: receives loaded record sets, returns matches and pool
//! accounting. Blocking, feature comparison, plausibility filtering and
//! best-match selection run per pass over the shrinking unmatched pool.

pub mod blocking;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod load;
pub mod model;
pub mod pool;
pub mod select;
pub mod similarity;
pub mod vocabulary;

pub use config::{LinkConfig, Pass, PassConfig};
pub use engine::{prepare, run, run_pass, run_passes};
pub use error::LinkError;
pub use load::load_records;
pub use model::{LinkResult, Match, PoolAccounting, Record, RecordSet, Side};
pub use pool::MatchPool;
pub use vocabulary::Vocabulary;
