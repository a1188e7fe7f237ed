use crate::*;

/// Correction of a pile's along-row position for row tilt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NorthingAdjustment {
    /// The corrected position.
    pub position: f64,
    /// `position - original`.
    pub distance: f64,
}

/// Corrects along-row positions so the structural spacing holds once the row is tilted.
///
/// Positions are held relative to an anchor pile (typically the drive pile). `height_diff` is the
/// vertical offset between the anchor's functional elevation and the structural pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NorthingAdjuster {
    /// Row slope, radians.
    pub slope: f64,
    pub anchor_position: f64,
    pub height_diff: f64,
}

impl NorthingAdjuster {
    /// Shift of the anchor itself, `sin(slope) * height_diff`.
    pub fn delta_anchor(&self) -> f64 {
        self.slope.sin() * self.height_diff
    }

    /// The tilted offset of `position` from the anchor.
    ///
    /// At the anchor the projection is undefined, so the anchor's own shift is negated instead.
    #[allow(clippy::float_cmp)]
    pub fn adjusted_delta(&self, position: f64) -> f64 {
        let dist = position - self.anchor_position;
        if dist == 0.0 {
            -self.delta_anchor()
        } else {
            dist * self.slope.cos()
        }
    }

    pub fn adjust(&self, position: f64) -> NorthingAdjustment {
        let dist = position - self.anchor_position;
        let new = position + self.adjusted_delta(position) - dist;
        NorthingAdjustment {
            position: new,
            distance: new - position,
        }
    }
}

/// Correct every pile in `row`.
///
/// The anchor is the first pile in row order matching `is_anchor`. Fails with
/// [`GradeError::MissingAnchor`] if none match. Returns the adjustment for each pile, in row order.
pub fn adjust_northings<F>(
    piles: &[Pile],
    row: &Row,
    slope: f64,
    height_diff: f64,
    is_anchor: F,
) -> Result<Vec<NorthingAdjustment>>
where
    F: Fn(&Pile) -> bool,
{
    let anchor = row
        .piles(piles)
        .find(|&p| is_anchor(p))
        .ok_or_else(|| GradeError::MissingAnchor {
            row_id: row.row_id.clone(),
        })?;

    let adj = NorthingAdjuster {
        slope,
        anchor_position: anchor.position(row.axis),
        height_diff,
    };

    Ok(row
        .piles(piles)
        .map(|p| adj.adjust(p.position(row.axis)))
        .collect())
}
