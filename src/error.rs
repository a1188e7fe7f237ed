use crate::{PileId, Point3, RowId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GradeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradeError {
    /// The row has zero variance along its axis, so no slope can be fitted.
    #[error("row {row_id} is degenerate: all piles share the same position")]
    DegenerateRow { row_id: RowId },

    #[error("invalid reveal envelope for pile {pile_id:?}: min {min} > max {max}")]
    InvalidEnvelope {
        pile_id: Option<PileId>,
        min: f64,
        max: f64,
    },

    /// Triangle at `index` (0-based) in the input did not resolve to 3 distinct points.
    #[error("malformed triangle at index {index}: {} point(s) supplied", points.len())]
    MalformedTriangle { index: usize, points: Vec<Point3> },

    #[error("row {row_id} has no anchor pile")]
    MissingAnchor { row_id: RowId },

    #[error("xml: {0}")]
    Xml(String),

    #[error("parse: {0}")]
    Parse(String),

    #[error("{0}")]
    Io(String),
}

impl GradeError {
    /// The row this error is attributed to, if any.
    pub fn row_id(&self) -> Option<&RowId> {
        match self {
            GradeError::DegenerateRow { row_id } | GradeError::MissingAnchor { row_id } => {
                Some(row_id)
            }
            _ => None,
        }
    }
}

impl From<std::io::Error> for GradeError {
    fn from(e: std::io::Error) -> Self {
        GradeError::Io(e.to_string())
    }
}
