use crate::*;

/// A row of piles, held as indices back into the pile slice it was grouped from.
///
/// Indices are ordered by ascending position along the row's axis (ties broken by pile id), so
/// the first index is the southern (or western) end of the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub row_id: RowId,
    pub axis: Axis,
    idxs: Vec<usize>,
}

impl Row {
    /// The pile indices, in row order.
    pub fn idxs(&self) -> &[usize] {
        &self.idxs
    }

    pub fn len(&self) -> usize {
        self.idxs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idxs.is_empty()
    }

    /// Iterate the row's piles, in row order.
    pub fn piles<'a>(&'a self, piles: &'a [Pile]) -> impl ExactSizeIterator<Item = &'a Pile> + 'a {
        self.idxs.iter().map(move |&i| &piles[i])
    }

    /// Extent of the row along its axis, `max(position) - min(position)`.
    pub fn length(&self, piles: &[Pile]) -> f64 {
        let mut ps = self.piles(piles).map(|p| p.position(self.axis));
        match ps.next() {
            Some(first) => {
                let (min, max) = ps.fold((first, first), |(a, b), p| (a.min(p), b.max(p)));
                max - min
            }
            None => 0.0,
        }
    }
}

/// Group piles by [`RowId`] equality.
///
/// The returned rows are sorted by `row_id`, and each row's piles are ordered along `axis`.
pub fn group_rows(piles: &[Pile], axis: Axis) -> Vec<Row> {
    let mut map: HashMap<&str, Vec<usize>> = HashMap::default();
    for (i, p) in piles.iter().enumerate() {
        map.entry(p.row_id.as_str()).or_default().push(i);
    }

    let mut rows = map
        .into_iter()
        .map(|(row_id, mut idxs)| {
            idxs.sort_by(|&a, &b| {
                let (a, b) = (&piles[a], &piles[b]);
                a.position(axis)
                    .total_cmp(&b.position(axis))
                    .then_with(|| a.id.cmp(&b.id))
            });
            Row {
                row_id: row_id.to_string(),
                axis,
                idxs,
            }
        })
        .collect::<Vec<_>>();

    rows.sort_unstable_by(|a, b| a.row_id.cmp(&b.row_id));
    rows
}
