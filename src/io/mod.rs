//! Mesh interchange.
//! Writes (and reads back) graded surfaces as LandXML TIN surfaces.
use crate::*;
use std::io::Write;

pub mod landxml;
