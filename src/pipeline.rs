//! Row-wise grading pipeline.
//!
//! Runs the pile stages in order: fit each row, optionally smooth east/west, clamp reveals (with
//! flood uplift when configured), report slopes, and correct along-row positions. Rows are
//! evaluated in parallel. Per-row and per-pile failures are collected into the report rather than
//! aborting the batch.
use crate::*;
use rayon::prelude::*;

/// Project level grading configuration.
///
/// Missing fields take their [`Default`] value when deserialized.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GradingParams {
    pub min_reveal: f64,
    pub max_reveal: f64,
    /// Enables flood uplift.
    pub flood_critical: Option<f64>,
    /// Enables the along-row position correction (an anchor predicate is also required).
    pub height_diff: Option<f64>,
    /// Neighbour bearing window half width, degrees.
    pub bearing_half_width: f64,
    pub neighbour_count: usize,
    pub search_radius: f64,
    pub optimise_neighbours: bool,
    /// Move each pile's target onto its row's fitted line before smoothing.
    pub snap_to_fit: bool,
    pub slope_unit: SlopeUnit,
    pub axis: Axis,
}

impl Default for GradingParams {
    fn default() -> Self {
        let e = Envelope::default();
        Self {
            min_reveal: e.min(),
            max_reveal: e.max(),
            flood_critical: None,
            height_diff: None,
            bearing_half_width: BEARING_HALF_WIDTH,
            neighbour_count: 8,
            search_radius: 50.0,
            optimise_neighbours: false,
            snap_to_fit: false,
            slope_unit: SlopeUnit::default(),
            axis: Axis::default(),
        }
    }
}

impl GradingParams {
    pub fn envelope(&self) -> Result<Envelope> {
        Envelope::new(self.min_reveal, self.max_reveal)
    }

    pub fn radius_search(&self) -> RadiusSearch {
        RadiusSearch {
            k: self.neighbour_count,
            radius: self.search_radius,
        }
    }
}

/// Per-row outcome.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RowReport {
    pub row_id: RowId,
    pub pile_count: usize,
    /// `max(position) - min(position)`.
    pub length: f64,
    /// `None` if the row is degenerate.
    pub fit: Option<RowFit>,
    /// Fitted slope in the configured unit, north positive.
    pub slope: Option<f64>,
    /// Flood uplift applied to the row, if flood adjustment ran.
    pub uplift: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GradingReport {
    /// Sorted by `row_id`.
    pub rows: Vec<RowReport>,
    pub errors: Vec<GradeError>,
}

impl GradingReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn row(&self, row_id: &str) -> Option<&RowReport> {
        self.rows
            .binary_search_by(|r| r.row_id.as_str().cmp(row_id))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn degenerate_rows(&self) -> impl Iterator<Item = &RowId> {
        self.errors.iter().filter_map(|e| match e {
            GradeError::DegenerateRow { row_id } => Some(row_id),
            _ => None,
        })
    }
}

/// Row context carried through the stages.
struct RowCtx {
    row: Row,
    fit: Option<RowFit>,
    uplift: Option<f64>,
}

/// The result of clamping one row, applied after the parallel pass.
struct RowClamp {
    clamps: Vec<(usize, f64, Clamped)>,
    uplift: Option<f64>,
    errors: Vec<GradeError>,
}

/// Runs the grading stages over a field of piles.
///
/// # Example
/// ```rust
/// # use pilegrade::*;
/// let mut piles = vec![
///     Pile::new("1", "A", [0.0, 0.0], 100.0, 110.0),
///     Pile::new("2", "A", [0.0, 10.0], 100.0, 104.0),
/// ];
/// let report = Grader::new(GradingParams::default()).run(&mut piles).unwrap();
///
/// assert!(report.is_clean());
/// assert_eq!(piles[0].reveal, Some(6.0));
/// assert_eq!(piles[1].grade, Some(100.0));
/// ```
pub struct Grader<S = RadiusSearch, F = fn(&Pile) -> bool> {
    params: GradingParams,
    search: S,
    is_anchor: Option<F>,
}

impl Grader {
    /// A grader using a [`RadiusSearch`] built from `params`, and no anchor predicate.
    pub fn new(params: GradingParams) -> Self {
        let search = params.radius_search();
        Self {
            params,
            search,
            is_anchor: None,
        }
    }
}

impl<S, F> Grader<S, F>
where
    S: NeighbourSearch + Sync,
    F: Fn(&Pile) -> bool + Sync,
{
    pub fn params(&self) -> &GradingParams {
        &self.params
    }

    /// Use another source of neighbour candidates.
    pub fn with_search<S2>(self, search: S2) -> Grader<S2, F> {
        Grader {
            params: self.params,
            search,
            is_anchor: self.is_anchor,
        }
    }

    /// Set the predicate identifying a row's anchor pile.
    pub fn with_anchor<F2>(self, is_anchor: F2) -> Grader<S, F2> {
        Grader {
            params: self.params,
            search: self.search,
            is_anchor: Some(is_anchor),
        }
    }

    /// Run all stages over `piles`, updating them in place.
    ///
    /// Fails only if the project envelope is invalid. Everything else is collected in
    /// [`GradingReport::errors`].
    pub fn run(&self, piles: &mut [Pile]) -> Result<GradingReport> {
        let p = &self.params;
        let envelope = p.envelope()?;
        let mut errors = Vec::new();

        // fit
        let rows = group_rows(piles, p.axis);
        let mut ctxs = self.fit_rows(piles, rows, &mut errors);

        if p.snap_to_fit {
            snap_to_fit(piles, &ctxs);
        }

        // smooth
        if p.optimise_neighbours {
            let mut excluded = vec![false; piles.len()];
            for ctx in ctxs.iter().filter(|c| c.fit.is_none()) {
                for &i in ctx.row.idxs() {
                    excluded[i] = true;
                }
            }
            optimise_east_west(piles, &self.search, p.bearing_half_width, |i| excluded[i]);

            // targets moved, so the final slope needs a refit
            let snapshot: &[Pile] = piles;
            ctxs.par_iter_mut().filter(|c| c.fit.is_some()).for_each(|c| {
                c.fit = RowFit::fit_row(&c.row.row_id, p.axis, c.row.piles(snapshot)).ok();
            });
        }

        // clamp + flood
        let snapshot: &[Pile] = piles;
        let clamps = ctxs
            .par_iter()
            .map(|ctx| self.clamp_row(snapshot, &ctx.row, envelope))
            .collect::<Vec<_>>();
        for (ctx, rc) in ctxs.iter_mut().zip(clamps) {
            for (i, target, c) in rc.clamps {
                piles[i].target_elevation = target;
                piles[i].apply(c);
            }
            ctx.uplift = rc.uplift;
            errors.extend(rc.errors);
        }

        // slope reporting
        for ctx in &ctxs {
            if let Some(fit) = ctx.fit {
                let slope = fit.report(p.slope_unit);
                for &i in ctx.row.idxs() {
                    piles[i].slope = Some(slope);
                }
            }
        }

        // northing
        if let (Some(hd), Some(is_anchor)) = (p.height_diff, self.is_anchor.as_ref()) {
            let snapshot: &[Pile] = piles;
            let adjs = ctxs
                .par_iter()
                .filter_map(|ctx| ctx.fit.map(|fit| (ctx, fit)))
                .map(|(ctx, fit)| {
                    adjust_northings(snapshot, &ctx.row, fit.radians(), hd, is_anchor)
                        .map(|a| (ctx.row.idxs(), a))
                })
                .collect::<Vec<_>>();

            for r in adjs {
                match r {
                    Ok((idxs, adjs)) => {
                        for (&i, adj) in idxs.iter().zip(adjs) {
                            piles[i].shift(adj);
                        }
                    }
                    Err(e) => errors.push(e),
                }
            }
        }

        for e in &errors {
            log::warn!("{}", e);
        }

        let rows = ctxs
            .into_iter()
            .map(|ctx| RowReport {
                pile_count: ctx.row.len(),
                length: ctx.row.length(piles),
                slope: ctx.fit.map(|f| f.report(p.slope_unit)),
                fit: ctx.fit,
                uplift: ctx.uplift,
                row_id: ctx.row.row_id,
            })
            .collect::<Vec<_>>();

        log::debug!(
            "graded {} piles over {} rows with {} error(s)",
            piles.len(),
            rows.len(),
            errors.len()
        );

        Ok(GradingReport { rows, errors })
    }

    fn fit_rows(
        &self,
        piles: &[Pile],
        rows: Vec<Row>,
        errors: &mut Vec<GradeError>,
    ) -> Vec<RowCtx> {
        let axis = self.params.axis;
        let fits = rows
            .par_iter()
            .map(|row| RowFit::fit_row(&row.row_id, axis, row.piles(piles)))
            .collect::<Vec<_>>();

        rows.into_iter()
            .zip(fits)
            .map(|(row, fit)| {
                let fit = match fit {
                    Ok(fit) => {
                        log::debug!("row {} fit: {:?}", row.row_id, fit);
                        Some(fit)
                    }
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                };
                RowCtx {
                    row,
                    fit,
                    uplift: None,
                }
            })
            .collect()
    }

    fn clamp_row(&self, piles: &[Pile], row: &Row, project: Envelope) -> RowClamp {
        let mut errors = Vec::new();
        let valid = row
            .idxs()
            .iter()
            .filter_map(|&i| match piles[i].envelope(project) {
                Ok(e) => Some((i, e)),
                Err(e) => {
                    errors.push(e);
                    None
                }
            })
            .collect::<Vec<_>>();

        let clamp_only = |valid: Vec<(usize, Envelope)>| {
            valid
                .into_iter()
                .map(|(i, e)| {
                    let p = &piles[i];
                    (i, p.target_elevation, e.clamp(p.target_elevation, p.existing_grade))
                })
                .collect::<Vec<_>>()
        };

        match self.params.flood_critical {
            // an invalid envelope anywhere in the row aborts the row's flood step
            Some(_) if !errors.is_empty() => {
                log::debug!("row {} skips flood adjustment", row.row_id);
                RowClamp {
                    clamps: clamp_only(valid),
                    uplift: None,
                    errors,
                }
            }
            Some(critical) => {
                let inputs = valid
                    .iter()
                    .map(|&(i, envelope)| FloodInput {
                        target: piles[i].target_elevation,
                        existing: piles[i].existing_grade,
                        envelope,
                        depth: piles[i].flood_depth,
                    })
                    .collect::<Vec<_>>();
                let out = FloodAdjuster::new(critical).adjust_row(&inputs);
                let clamps = valid
                    .iter()
                    .zip(out.clamped)
                    .map(|(&(i, _), c)| (i, piles[i].target_elevation + out.uplift, c))
                    .collect();
                RowClamp {
                    clamps,
                    uplift: Some(out.uplift),
                    errors,
                }
            }
            None => RowClamp {
                clamps: clamp_only(valid),
                uplift: None,
                errors,
            },
        }
    }
}

fn snap_to_fit(piles: &mut [Pile], ctxs: &[RowCtx]) {
    for ctx in ctxs {
        if let Some(fit) = ctx.fit {
            for &i in ctx.row.idxs() {
                let p = &mut piles[i];
                p.target_elevation = fit.elevation_at(p.position(ctx.row.axis));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two rows 10 apart in x. Row A rises 1 in 10 to the north, row B is flat.
    fn field() -> Vec<Pile> {
        let mut v = Vec::new();
        for i in 0..4 {
            let y = i as f64 * 10.0;
            v.push(Pile::new(format!("A{}", i), "A", [0.0, y], 100.0, 105.0 + i as f64));
            v.push(Pile::new(format!("B{}", i), "B", [10.0, y], 100.0, 105.0));
        }
        v
    }

    #[test]
    fn default_params() {
        let p = GradingParams::default();
        assert_eq!(p.min_reveal, 4.0);
        assert_eq!(p.max_reveal, 6.0);
        assert_eq!(p.bearing_half_width, 2.5);
        assert_eq!(p.slope_unit, SlopeUnit::Percent);
        assert_eq!(p.axis, Axis::Northing);
        assert!(p.flood_critical.is_none());
    }

    #[test]
    fn params_from_json() {
        let json = r#"{ "min_reveal": 2.0, "flood_critical": 1.5, "axis": "Easting" }"#;
        let p: GradingParams = serde_json::from_str(json).unwrap();
        assert_eq!(p.min_reveal, 2.0);
        assert_eq!(p.max_reveal, 6.0);
        assert_eq!(p.flood_critical, Some(1.5));
        assert_eq!(p.axis, Axis::Easting);
        assert!(!p.optimise_neighbours);
    }

    #[test]
    fn clamps_and_reports_slopes() {
        let mut piles = field();
        let report = Grader::new(GradingParams::default())
            .run(&mut piles)
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.rows.len(), 2);

        let a = report.row("A").unwrap();
        assert_eq!(a.pile_count, 4);
        assert_eq!(a.length, 30.0);
        assert!((a.fit.unwrap().slope - 0.1).abs() < 1e-11);
        assert!((a.slope.unwrap() - -10.0).abs() < 1e-9);
        assert_eq!(a.uplift, None);

        let b = report.row("B").unwrap();
        assert!(b.slope.unwrap().abs() < 1e-11);

        // A0 5 -> 5, A1 6 -> 6, A2 7 -> 6, A3 8 -> 6
        let reveals = piles
            .iter()
            .filter(|p| p.row_id == "A")
            .map(|p| p.reveal.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(reveals, [5.0, 6.0, 6.0, 6.0]);
        assert_eq!(piles[6].grade, Some(102.0));
        for p in &piles {
            assert!(p.slope.is_some());
            assert!(p.adjustment_distance.is_none());
        }
    }

    #[test]
    fn degenerate_rows_are_collected() {
        let mut piles = field();
        piles.push(Pile::new("C0", "C", [20.0, 5.0], 100.0, 105.0));
        piles.push(Pile::new("C1", "C", [20.5, 5.0], 100.0, 106.0));

        let params = GradingParams {
            optimise_neighbours: true,
            ..Default::default()
        };
        let report = Grader::new(params).run(&mut piles).unwrap();

        assert_eq!(report.degenerate_rows().collect::<Vec<_>>(), ["C"]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.row("C").unwrap().fit.is_none());

        // the degenerate row is not smoothed but is still clamped
        assert_eq!(piles[8].target_elevation, 105.0);
        assert_eq!(piles[8].reveal, Some(5.0));
        assert_eq!(piles[8].slope, None);

        // every other pile was graded
        assert!(piles[..8].iter().all(|p| p.reveal.is_some() && p.slope.is_some()));
    }

    #[test]
    fn invalid_pile_envelope() {
        let mut piles = field();
        piles[0] = piles[0].clone().with_envelope(7.0, 3.0);
        let report = Grader::new(GradingParams::default())
            .run(&mut piles)
            .unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            &report.errors[0],
            GradeError::InvalidEnvelope { pile_id: Some(id), .. } if id == "A0"
        ));
        assert_eq!(piles[0].reveal, None);
        assert!(piles[1..].iter().all(|p| p.reveal.is_some()));
    }

    #[test]
    fn invalid_project_envelope() {
        let mut piles = field();
        let params = GradingParams {
            min_reveal: 6.0,
            max_reveal: 2.0,
            ..Default::default()
        };
        assert!(Grader::new(params).run(&mut piles).is_err());
    }

    #[test]
    fn flood_uplift_per_row() {
        let mut piles = field();
        // A0: reveal 5 (clearance 1), grade 100. Depth 3 > 1, revised 3 - 100 + 100 - 1 = 2.
        piles[0].flood_depth = Some(3.0);
        let params = GradingParams {
            flood_critical: Some(1.0),
            ..Default::default()
        };
        let report = Grader::new(params).run(&mut piles).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.row("A").unwrap().uplift, Some(1.0));
        assert_eq!(report.row("B").unwrap().uplift, Some(0.0));

        assert_eq!(piles[0].target_elevation, 106.0);
        assert_eq!(piles[0].reveal, Some(6.0));
        assert_eq!(piles[2].target_elevation, 107.0);
        assert_eq!(piles[1].target_elevation, 105.0);
    }

    #[test]
    fn invalid_envelope_aborts_row_flood() {
        let mut piles = field();
        piles[0].flood_depth = Some(4.0);
        piles[4] = piles[4].clone().with_envelope(7.0, 3.0);
        let params = GradingParams {
            flood_critical: Some(1.0),
            ..Default::default()
        };
        let report = Grader::new(params).run(&mut piles).unwrap();

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            &report.errors[0],
            GradeError::InvalidEnvelope { pile_id: Some(id), .. } if id == "A2"
        ));

        // row A is clamped but not lifted
        assert_eq!(report.row("A").unwrap().uplift, None);
        let targets = piles
            .iter()
            .filter(|p| p.row_id == "A")
            .map(|p| p.target_elevation)
            .collect::<Vec<_>>();
        assert_eq!(targets, [105.0, 106.0, 107.0, 108.0]);
        assert_eq!(piles[0].reveal, Some(5.0));
        assert_eq!(piles[4].reveal, None);
        assert_eq!(piles[6].reveal, Some(6.0));

        // other rows still run the flood step
        assert_eq!(report.row("B").unwrap().uplift, Some(0.0));
    }

    #[test]
    fn neighbour_smoothing_refits() {
        let mut piles = field();
        piles.extend((0..4).map(|i| {
            Pile::new(format!("C{}", i), "C", [20.0, i as f64 * 10.0], 100.0, 105.0 + i as f64)
        }));
        let params = GradingParams {
            optimise_neighbours: true,
            min_reveal: 0.0,
            max_reveal: 20.0,
            ..Default::default()
        };
        let report = Grader::new(params).run(&mut piles).unwrap();
        assert!(report.is_clean());

        // row B sits between A and C, theoretical 105 + i, half step
        for i in 0..4 {
            let b = &piles[i * 2 + 1];
            assert_eq!(b.target_elevation, 105.0 + i as f64 * 0.5);
        }
        let b = report.row("B").unwrap();
        assert!((b.fit.unwrap().slope - 0.05).abs() < 1e-11);
    }

    #[test]
    fn snapping_to_fit() {
        let mut piles = vec![
            Pile::new("1", "R", [0.0, 0.0], 100.0, 105.0),
            Pile::new("2", "R", [0.0, 10.0], 100.0, 107.0),
            Pile::new("3", "R", [0.0, 20.0], 100.0, 105.0),
        ];
        let params = GradingParams {
            snap_to_fit: true,
            min_reveal: 0.0,
            max_reveal: 20.0,
            ..Default::default()
        };
        Grader::new(params).run(&mut piles).unwrap();
        for p in &piles {
            assert!((p.target_elevation - (17.0 / 3.0 + 100.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn northing_with_anchor() {
        let mut piles = field();
        let params = GradingParams {
            height_diff: Some(0.5),
            ..Default::default()
        };
        let report = Grader::new(params)
            .with_anchor(|p: &Pile| p.id == "A1" || p.id == "B1")
            .run(&mut piles)
            .unwrap();
        assert!(report.is_clean());

        let t = 0.1f64.atan();
        // A1 is the anchor, pulled south as the row rises north
        let d = piles[2].adjustment_distance.unwrap();
        assert!(d < 0.0);
        assert!((d - -(t.sin() * 0.5)).abs() < 1e-11);
        assert!((piles[2].adjusted_position.unwrap() - (10.0 + d)).abs() < 1e-11);
        // A3 is 20 north of the anchor
        let a3 = piles[6].adjusted_position.unwrap();
        assert!((a3 - (10.0 + 20.0 * t.cos())).abs() < 1e-9);

        // survey coordinates and row extents are untouched
        assert_eq!(piles[6].y, 30.0);
        assert_eq!(report.row("A").unwrap().length, 30.0);
        // flat row B only shifts at its anchor, by zero
        assert!(piles
            .iter()
            .filter(|p| p.row_id == "B")
            .all(|p| p.adjustment_distance.unwrap().abs() < 1e-11));
    }

    #[test]
    fn northing_missing_anchor() {
        let mut piles = field();
        let params = GradingParams {
            height_diff: Some(0.5),
            ..Default::default()
        };
        let report = Grader::new(params)
            .with_anchor(|p: &Pile| p.id == "A1")
            .run(&mut piles)
            .unwrap();
        assert_eq!(
            report.errors,
            vec![GradeError::MissingAnchor {
                row_id: "B".to_string()
            }]
        );
        assert!(piles[2].adjustment_distance.is_some());
        assert!(piles[3].adjustment_distance.is_none());
    }
}
