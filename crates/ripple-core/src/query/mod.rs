//! Analysis queries: impact-set generation, coverage estimation, and the
//! quality gate.

pub mod coverage;
pub mod gate;
pub mod impact;
