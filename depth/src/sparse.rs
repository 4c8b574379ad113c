//! Sparse (coordinate, value) view of valid depth pixels.

use cv_core::DepthMap;
use rayon::prelude::*;

/// One valid depth pixel, tagged with its batch item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparsePoint {
    pub batch: usize,
    pub row: i64,
    pub col: i64,
    pub depth: f32,
}

/// Valid (`depth > 0`) pixels of a depth map in collated order: batch-major,
/// then row-major within each item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparsePointSet {
    points: Vec<SparsePoint>,
}

impl SparsePointSet {
    /// Gather every pixel with `depth > 0`.
    pub fn from_depth(depth: &DepthMap) -> crate::Result<Self> {
        crate::ensure_single_channel(depth, "Depth")?;
        let width = depth.shape().width;
        let batch = depth.shape().batch;

        let (coords, feats): (Vec<Vec<[i64; 2]>>, Vec<Vec<f32>>) = (0..batch)
            .into_par_iter()
            .map(|b| {
                let item: (Vec<[i64; 2]>, Vec<f32>) = depth
                    .item(b)
                    .iter()
                    .enumerate()
                    .filter(|&(_, &d)| d > 0.0)
                    .map(|(i, &d)| ([(i / width) as i64, (i % width) as i64], d))
                    .unzip();
                item
            })
            .unzip();

        let (tagged, values) = sparse_collate(&coords, &feats)?;
        let points = tagged
            .into_iter()
            .zip(values)
            .map(|([b, row, col], depth)| SparsePoint {
                batch: b as usize,
                row,
                col,
                depth,
            })
            .collect();
        Ok(Self { points })
    }

    pub fn points(&self) -> &[SparsePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SparsePoint> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a SparsePointSet {
    type Item = &'a SparsePoint;
    type IntoIter = std::slice::Iter<'a, SparsePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Pack per-item coordinates and features into one batch-tagged list.
///
/// Row `k` of the output is `[b, coord...]` for the `k`-th point overall, `b`
/// being the index of the item it came from. Features are concatenated in the
/// same order.
pub fn sparse_collate(
    coords: &[Vec<[i64; 2]>],
    feats: &[Vec<f32>],
) -> crate::Result<(Vec<[i64; 3]>, Vec<f32>)> {
    if coords.len() != feats.len() {
        return Err(crate::Error::dimension_mismatch(format!(
            "Got coordinates for {} items but features for {}",
            coords.len(),
            feats.len()
        )));
    }

    let total: usize = coords.iter().map(Vec::len).sum();
    let mut tagged = Vec::with_capacity(total);
    let mut values = Vec::with_capacity(total);
    for (b, (c, f)) in coords.iter().zip(feats).enumerate() {
        if c.len() != f.len() {
            return Err(crate::Error::dimension_mismatch(format!(
                "Item {b}: {} coordinates but {} features",
                c.len(),
                f.len()
            )));
        }
        tagged.extend(c.iter().map(|&[y, x]| [b as i64, y, x]));
        values.extend_from_slice(f);
    }
    Ok((tagged, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::{Tensor, TensorShape};

    #[test]
    fn collate_prefixes_batch_index() {
        let coords = vec![vec![[0, 1], [2, 3]], vec![], vec![[4, 5]]];
        let feats = vec![vec![1.0, 2.0], vec![], vec![3.0]];
        let (tagged, values) = sparse_collate(&coords, &feats).unwrap();
        assert_eq!(tagged, vec![[0, 0, 1], [0, 2, 3], [2, 4, 5]]);
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn collate_rejects_ragged_input() {
        assert!(sparse_collate(&[vec![[0, 0]]], &[]).is_err());
        assert!(sparse_collate(&[vec![[0, 0]]], &[vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn only_positive_depth_is_gathered() {
        let depth = Tensor::from_vec(
            vec![0.0, 2.0, -1.0, 0.0, /* item 1 */ 5.0, 0.0, 0.0, 7.0],
            TensorShape::map(2, 2, 2),
        )
        .unwrap();
        let set = SparsePointSet::from_depth(&depth).unwrap();
        let got: Vec<_> = set.iter().map(|p| (p.batch, p.row, p.col, p.depth)).collect();
        assert_eq!(got, vec![(0, 0, 1, 2.0), (1, 0, 0, 5.0), (1, 1, 1, 7.0)]);
    }

    #[test]
    fn empty_map_gives_empty_set() {
        let depth: Tensor = Tensor::zeros(TensorShape::map(3, 4, 4));
        assert!(SparsePointSet::from_depth(&depth).unwrap().is_empty());
    }

    #[test]
    fn multichannel_depth_is_rejected() {
        let depth = Tensor::ones(TensorShape::new(1, 2, 2, 2));
        assert!(SparsePointSet::from_depth(&depth).is_err());
    }
}
