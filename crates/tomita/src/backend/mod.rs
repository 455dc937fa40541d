//! # Parsing Backends
//!
//! - [`lr`]: canonical LR(1) table construction, conflicts preserved
//! - [`glr`]: the generalized LR stack machine that runs those tables and
//!   builds a shared packed parse forest

pub mod glr;
pub mod lr;
