//! aiqx-core: assessment packs, response parsing, heuristic scoring and
//! recommendations.
//!
//! The pipeline is parse → score → aggregate → append. Everything except the
//! [`traits::PackSource`] seam is synchronous and holds no global state:
//! callers own a [`workspace::Workspace`] and a [`session::Session`] and pass
//! them in explicitly.

pub mod builtin;
pub mod bundle;
pub mod compare;
pub mod error;
pub mod history;
pub mod ordered;
pub mod pack;
pub mod parser;
pub mod recommend;
pub mod scoring;
pub mod session;
pub mod statistics;
pub mod store;
pub mod traits;
pub mod workspace;

pub use error::{AiqError, Result};
pub use pack::{normalize_pack, Pack, TierName};
pub use parser::parse_response;
pub use scoring::score;
pub use session::{analyze, Session};
pub use statistics::aggregate_by_domain;
pub use workspace::Workspace;
