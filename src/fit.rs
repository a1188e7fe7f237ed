use crate::*;

/// Ordinary least squares line through a row, `elevation = slope * position + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RowFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Unit a row slope is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SlopeUnit {
    #[default]
    Percent,
    Degrees,
}

impl RowFit {
    /// Fits a line using the least squares method over `(position, elevation)` pairs.
    ///
    /// Returns `None` if there is no variance in position (less than two distinct positions).
    #[allow(clippy::float_cmp)]
    pub fn fit_least_sqs(pairs: &[(f64, f64)]) -> Option<Self> {
        if pairs.is_empty() {
            return None;
        }

        let n = (pairs.len() as f64).recip();
        let (sp, se) = pairs
            .iter()
            .fold((0.0, 0.0), |(sp, se), &(p, e)| (sp + p, se + e));
        let (pbar, ebar) = (sp * n, se * n);

        // centred sums
        let (spp, spe) = pairs.iter().fold((0.0, 0.0), |(spp, spe), &(p, e)| {
            let (dp, de) = (p - pbar, e - ebar);
            (spp + dp * dp, spe + dp * de)
        });

        if spp == 0.0 || !spp.is_finite() {
            return None;
        }

        let slope = spe / spp;
        Some(Self {
            slope,
            intercept: ebar - slope * pbar,
        })
    }

    /// Fit a row, using each pile's position along `axis` and its target elevation.
    ///
    /// Fails with [`GradeError::DegenerateRow`] if the fit is undefined.
    pub fn fit_row<'a, I>(row_id: &RowId, axis: Axis, piles: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Pile>,
    {
        let pairs = piles
            .into_iter()
            .map(|p| (p.position(axis), p.target_elevation))
            .collect::<Vec<_>>();

        Self::fit_least_sqs(&pairs).ok_or_else(|| GradeError::DegenerateRow {
            row_id: row_id.clone(),
        })
    }

    pub fn elevation_at(&self, position: f64) -> f64 {
        self.slope * position + self.intercept
    }

    /// The fitted slope as an angle in radians, positive where elevation rises along the row.
    ///
    /// This is the tilt used for position correction. It is not negated like the reported grade.
    pub fn radians(&self) -> f64 {
        self.slope.atan()
    }

    /// Reported grade percent, the fitted slope negated (north positive / south negative).
    pub fn grade_percent(&self) -> f64 {
        -self.slope * 100.0
    }

    pub fn report(&self, unit: SlopeUnit) -> f64 {
        let pc = self.grade_percent();
        match unit {
            SlopeUnit::Percent => pc,
            SlopeUnit::Degrees => percent_to_degrees(pc),
        }
    }
}

/// Convert a grade percent to an angle in degrees.
pub fn percent_to_degrees(percent: f64) -> f64 {
    (percent / 100.0).atan().to_degrees()
}
