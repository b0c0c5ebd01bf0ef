//! Pure data types for jobsh: job handles, placements, process states.
//!
//! This crate is a leaf dependency with no I/O and no process control.
//! It exists so that front ends can render job listings without pulling in
//! jobsh-kernel's fork/exec machinery.

pub mod job;

pub use job::*;
