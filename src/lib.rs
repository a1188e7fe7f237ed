//! Grading of ground-mounted solar pile fields.
//!
//! Fits row slopes, smooths elevations across rows, clamps pile reveal to a structural envelope
//! (raising rows out of flood where needed), corrects along-row positions for tilt, and builds an
//! indexed mesh of the graded surface for export.
use rustc_hash::FxHashMap as HashMap;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

mod error;
mod fit;
mod flood;
#[cfg(feature = "io")]
pub mod io;
mod mesh;
pub mod neighbour;
mod northing;
mod pile;
pub mod pipeline;
mod point;
mod reveal;
mod row;

pub use error::*;
pub use fit::*;
pub use flood::*;
pub use mesh::*;
pub use neighbour::*;
pub use northing::*;
pub use pile::*;
pub use pipeline::*;
pub use point::*;
pub use reveal::*;
pub use row::*;
