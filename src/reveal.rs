use crate::*;

/// Structural reveal bounds, `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Envelope {
    min: f64,
    max: f64,
}

/// Result of clamping a pile's reveal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamped {
    /// `target - existing`, before clamping.
    pub raw: f64,
    pub reveal: f64,
    /// Final grade elevation, `target - reveal`.
    pub grade: f64,
}

impl Envelope {
    /// Validate the bounds. Fails with [`GradeError::InvalidEnvelope`] if `min > max` or either
    /// bound is not finite.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min.is_finite() && max.is_finite() && min <= max {
            Ok(Self { min, max })
        } else {
            Err(GradeError::InvalidEnvelope {
                pile_id: None,
                min,
                max,
            })
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Clamp the reveal of a pile at `target` over ground at `existing`.
    ///
    /// # Example
    /// ```rust
    /// # use pilegrade::*;
    /// let c = Envelope::new(2.0, 8.0).unwrap().clamp(110.0, 100.0);
    /// assert_eq!(c.reveal, 8.0);
    /// assert_eq!(c.grade, 102.0);
    /// ```
    pub fn clamp(&self, target: f64, existing: f64) -> Clamped {
        let raw = target - existing;
        let reveal = if raw > self.max {
            self.max
        } else if raw < self.min {
            self.min
        } else {
            raw
        };

        Clamped {
            raw,
            reveal,
            grade: target - reveal,
        }
    }

    /// Headroom of `reveal` above the minimum.
    pub fn clearance(&self, reveal: f64) -> f64 {
        reveal - self.min
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self { min: 4.0, max: 6.0 }
    }
}

impl Clamped {
    /// Returns if the reveal was moved onto a bound.
    #[allow(clippy::float_cmp)]
    pub fn is_clamped(&self) -> bool {
        self.raw != self.reveal
    }
}
