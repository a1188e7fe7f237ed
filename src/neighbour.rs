//! East/west neighbour smoothing.
//!
//! Each pile is pulled half way toward the mean elevation of its nearest east and west
//! neighbours, which approximates a shared plane across adjacent rows.
use crate::*;
use rayon::prelude::*;

/// Default half width of the bearing windows, in degrees.
pub const BEARING_HALF_WIDTH: f64 = 2.5;

/// Supplies neighbour candidates for a pile.
///
/// Implementations are expected to return the `k` nearest piles within some bounded radius
/// (by index into `piles`). The pile itself may be returned; it is ignored.
pub trait NeighbourSearch {
    fn candidates(&self, piles: &[Pile], idx: usize) -> Vec<usize>;
}

/// Linear scan for the `k` nearest piles within `radius`.
///
/// This does not index anything, it is `O(n)` per query. Suitable for small fields and tests;
/// large fields should supply candidates from a spatial index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusSearch {
    pub k: usize,
    pub radius: f64,
}

impl NeighbourSearch for RadiusSearch {
    fn candidates(&self, piles: &[Pile], idx: usize) -> Vec<usize> {
        let o = piles[idx].xy();
        let mut v = piles
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != idx)
            .map(|(i, p)| (i, dist_xy(o, p.xy())))
            .filter(|&(_, d)| d <= self.radius)
            .collect::<Vec<_>>();
        v.sort_by(|a, b| a.1.total_cmp(&b.1));
        v.into_iter().take(self.k).map(|x| x.0).collect()
    }
}

/// A bearing window, `centre ± half_width` degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BearingWindow {
    pub centre: f64,
    pub half_width: f64,
}

impl BearingWindow {
    pub fn east(half_width: f64) -> Self {
        Self {
            centre: 90.0,
            half_width,
        }
    }

    pub fn west(half_width: f64) -> Self {
        Self {
            centre: -90.0,
            half_width,
        }
    }

    pub fn contains(&self, bearing: f64) -> bool {
        bearing_diff(bearing, self.centre).abs() <= self.half_width
    }
}

/// The nearest neighbours of a pile in the east and west windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeighbourPair {
    pub east: Option<usize>,
    pub west: Option<usize>,
}

impl NeighbourPair {
    /// Select the nearest candidate inside each window.
    pub fn find(piles: &[Pile], idx: usize, candidates: &[usize], half_width: f64) -> Self {
        let o = piles[idx].xy();
        let (east, west) = (BearingWindow::east(half_width), BearingWindow::west(half_width));

        let nearest = |w: BearingWindow| {
            candidates
                .iter()
                .copied()
                .filter(|&i| i != idx)
                .map(|i| (i, piles[i].xy()))
                .filter(|&(_, p)| dist_xy(o, p) > 0.0 && w.contains(bearing(o, p)))
                .min_by(|a, b| dist_xy(o, a.1).total_cmp(&dist_xy(o, b.1)))
                .map(|x| x.0)
        };

        Self {
            east: nearest(east),
            west: nearest(west),
        }
    }

    /// The theoretical target elevation for `pile`.
    ///
    /// Both neighbours must exist to average, otherwise the pile's current elevation is returned.
    pub fn theoretical(&self, piles: &[Pile], pile: &Pile) -> f64 {
        match (self.east, self.west) {
            (Some(e), Some(w)) => (piles[e].target_elevation + piles[w].target_elevation) * 0.5,
            _ => pile.target_elevation,
        }
    }
}

/// Move `current` half way toward `theoretical`.
pub fn damp(current: f64, theoretical: f64) -> f64 {
    current + (theoretical - current) * 0.5
}

/// Run a single smoothing pass over `piles`.
///
/// Theoretical elevations are computed from the elevations as they stand before the pass, then
/// applied together. Piles where `exclude` returns true are not moved (but still act as
/// neighbours). Returns the number of piles whose elevation changed.
#[allow(clippy::float_cmp)]
pub fn optimise_east_west<S, F>(
    piles: &mut [Pile],
    search: &S,
    half_width: f64,
    exclude: F,
) -> usize
where
    S: NeighbourSearch + Sync,
    F: Fn(usize) -> bool + Sync,
{
    let snapshot: &[Pile] = piles;
    let optimised = (0..snapshot.len())
        .into_par_iter()
        .map(|i| {
            if exclude(i) {
                return None;
            }
            let pile = &snapshot[i];
            let candidates = search.candidates(snapshot, i);
            let pair = NeighbourPair::find(snapshot, i, &candidates, half_width);
            let theo = pair.theoretical(snapshot, pile);
            Some(damp(pile.target_elevation, theo))
        })
        .collect::<Vec<_>>();

    let mut moved = 0;
    for (pile, z) in piles.iter_mut().zip(optimised) {
        if let Some(z) = z {
            if z != pile.target_elevation {
                moved += 1;
            }
            pile.target_elevation = z;
        }
    }

    log::debug!("east/west optimisation moved {} of {} piles", moved, piles.len());

    moved
}
