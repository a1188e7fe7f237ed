use crate::*;

/// Raises whole rows so every pile clears a flood-critical margin.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FloodAdjuster {
    /// Flood depth at which piles need raising.
    pub critical: f64,
}

/// A pile as seen by the flood adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodInput {
    pub target: f64,
    pub existing: f64,
    pub envelope: Envelope,
    pub depth: Option<f64>,
}

/// Outcome of adjusting one row.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodOutcome {
    /// Uniform rise applied to every target in the row.
    pub uplift: f64,
    /// Final clamp of each pile, in input order.
    pub clamped: Vec<Clamped>,
}

impl FloodAdjuster {
    pub fn new(critical: f64) -> Self {
        Self { critical }
    }

    /// Residual flood depth over a pile after accounting for its reveal clearance.
    ///
    /// At or below the critical depth the clearance is taken off the depth directly. Above it the
    /// depth is measured against the graded surface, so the cut/fill at the pile
    /// (`grade - existing`) is also taken off. The step at `critical` is intended.
    pub fn revised(&self, depth: f64, existing: f64, envelope: Envelope, c: Clamped) -> f64 {
        let clearance = envelope.clearance(c.reveal);
        let r = if depth <= self.critical {
            depth - clearance
        } else {
            depth - c.grade + existing - clearance
        };
        r.max(0.0)
    }

    /// The rise for a row, driven by its worst pile.
    pub fn row_uplift<I>(&self, revised: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let worst = revised.into_iter().fold(0f64, f64::max);
        (worst - self.critical).max(0.0)
    }

    /// Clamp, find the row uplift, raise all targets and clamp again.
    pub fn adjust_row(&self, row: &[FloodInput]) -> FloodOutcome {
        let revised = row.iter().map(|p| {
            let c = p.envelope.clamp(p.target, p.existing);
            p.depth
                .map(|d| self.revised(d, p.existing, p.envelope, c))
                .unwrap_or_default()
        });
        let uplift = self.row_uplift(revised);

        let clamped = row
            .iter()
            .map(|p| p.envelope.clamp(p.target + uplift, p.existing))
            .collect();

        FloodOutcome { uplift, clamped }
    }
}
