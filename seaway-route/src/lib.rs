//! Maritime sea-lane routing core: coordinate parsing, UN/LOCODE port
//! snapping, chokepoint-aware sea-graph construction, and the query-time
//! dispatch glue an external road-routing matrix service calls into.
//!
//! See [`seagraph::builder::build`] for the offline graph build pipeline and
//! [`dispatch::route`] for the per-request entry point.

pub mod chokepoint;
pub mod coord;
pub mod dispatch;
pub mod filter;
pub mod port;
pub mod seagraph;

pub use seaway_common::{Error, Result};
