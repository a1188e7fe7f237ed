use crate::*;

/// Pile identifier, as supplied by the survey source.
pub type PileId = String;

/// Row identifier. Not unique across piles; piles sharing a `RowId` share framing.
pub type RowId = String;

/// A support pile.
///
/// The survey fields (`id` through `flood_depth`) are supplied by the caller. The output fields
/// are `None` until the pipeline stage that owns them has run.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Pile {
    pub id: PileId,
    pub row_id: RowId,
    pub x: f64,
    pub y: f64,
    /// Surveyed ground elevation.
    pub existing_grade: f64,
    /// Candidate plane-of-array (top of pile) elevation. Mutated by the pipeline stages.
    pub target_elevation: f64,
    /// Per pile override of the project minimum reveal.
    #[serde(default)]
    pub min_reveal: Option<f64>,
    /// Per pile override of the project maximum reveal.
    #[serde(default)]
    pub max_reveal: Option<f64>,
    #[serde(default)]
    pub flood_depth: Option<f64>,

    // ###### OUTPUTS ##########################################################
    #[serde(default)]
    pub reveal: Option<f64>,
    /// Final grade elevation, `target_elevation - reveal`.
    #[serde(default)]
    pub grade: Option<f64>,
    /// Row slope in the reported unit (north positive).
    #[serde(default)]
    pub slope: Option<f64>,
    /// Tilt-corrected position along the row's axis. The surveyed `x`/`y` are left as is.
    #[serde(default)]
    pub adjusted_position: Option<f64>,
    #[serde(default)]
    pub adjustment_distance: Option<f64>,
}

impl Pile {
    pub fn new(
        id: impl Into<PileId>,
        row_id: impl Into<RowId>,
        xy: Point2,
        existing_grade: f64,
        target_elevation: f64,
    ) -> Self {
        let [x, y] = xy;
        Self {
            id: id.into(),
            row_id: row_id.into(),
            x,
            y,
            existing_grade,
            target_elevation,
            ..Default::default()
        }
    }

    pub fn with_flood_depth(mut self, depth: f64) -> Self {
        self.flood_depth = Some(depth);
        self
    }

    pub fn with_envelope(mut self, min_reveal: f64, max_reveal: f64) -> Self {
        self.min_reveal = Some(min_reveal);
        self.max_reveal = Some(max_reveal);
        self
    }

    /// Plan location.
    pub fn xy(&self) -> Point2 {
        [self.x, self.y]
    }

    /// Position along the given axis.
    pub fn position(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Northing => self.y,
            Axis::Easting => self.x,
        }
    }

    /// The reveal envelope for this pile, falling back to `project` for missing bounds.
    pub fn envelope(&self, project: Envelope) -> Result<Envelope> {
        match (self.min_reveal, self.max_reveal) {
            (None, None) => Ok(project),
            (min, max) => Envelope::new(
                min.unwrap_or(project.min()),
                max.unwrap_or(project.max()),
            )
            .map_err(|e| match e {
                GradeError::InvalidEnvelope { min, max, .. } => GradeError::InvalidEnvelope {
                    pile_id: Some(self.id.clone()),
                    min,
                    max,
                },
                e => e,
            }),
        }
    }

    /// Write a clamp result back onto the pile.
    pub(crate) fn apply(&mut self, clamped: Clamped) {
        self.reveal = Some(clamped.reveal);
        self.grade = Some(clamped.grade);
    }

    /// Record a position correction.
    pub(crate) fn shift(&mut self, adj: NorthingAdjustment) {
        self.adjusted_position = Some(adj.position);
        self.adjustment_distance = Some(adj.distance);
    }
}

/// The axis a row runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    /// Rows run north-south; position is the `y` coordinate.
    #[default]
    Northing,
    /// Rows run east-west; position is the `x` coordinate.
    Easting,
}
