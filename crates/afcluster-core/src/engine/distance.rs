use crate::core::encoding::EncodedMatrix;

/// A finite set of points with a symmetric distance between any two of them.
pub trait DistanceSpace {
    fn len(&self) -> usize;

    fn distance(&self, i: usize, j: usize) -> f64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DistanceSpace for EncodedMatrix {
    fn len(&self) -> usize {
        self.num_rows()
    }

    fn distance(&self, i: usize, j: usize) -> f64 {
        EncodedMatrix::distance(self, i, j)
    }
}

/// Precomputed Euclidean distances between all rows of an [`EncodedMatrix`].
///
/// Squared distances of one-hot rows are integers, so they are stored exactly in the
/// condensed upper triangle and the square root is taken on access.
///
/// The table holds `n * (n - 1) / 2` entries of four bytes whatever the radius, about 1.8 GB
/// for 30 000 members. See [`PairwiseDistances::table_bytes`] to check a size up front.
#[derive(Debug, Clone)]
pub struct PairwiseDistances {
    n: usize,
    condensed: Vec<u32>,
    max_squared: u32,
}

impl PairwiseDistances {
    /// Bytes taken by the condensed table for `n` points.
    pub fn table_bytes(n: usize) -> u64 {
        let n = n as u64;
        n * n.saturating_sub(1) / 2 * std::mem::size_of::<u32>() as u64
    }

    pub fn from_matrix(matrix: &EncodedMatrix) -> Self {
        let n = matrix.num_rows();
        let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        let mut max_squared = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                let sq = matrix.squared_distance(i, j) as u32;
                max_squared = max_squared.max(sq);
                condensed.push(sq);
            }
        }
        Self {
            n,
            condensed,
            max_squared,
        }
    }

    #[inline]
    fn condensed_index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.n * i - i * (i + 1) / 2 + (j - i - 1)
    }

    /// The largest distance between any two points, or `0.0` for fewer than two points.
    pub fn max_distance(&self) -> f64 {
        (self.max_squared as f64).sqrt()
    }

    /// A view restricted to `rows`, re-indexed in the given order.
    pub fn subset(&self, rows: Vec<usize>) -> SubsetDistances<'_> {
        SubsetDistances { base: self, rows }
    }
}

impl DistanceSpace for PairwiseDistances {
    fn len(&self) -> usize {
        self.n
    }

    #[inline]
    fn distance(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        (self.condensed[self.condensed_index(i, j)] as f64).sqrt()
    }
}

pub struct SubsetDistances<'a> {
    base: &'a PairwiseDistances,
    rows: Vec<usize>,
}

impl DistanceSpace for SubsetDistances<'_> {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn distance(&self, i: usize, j: usize) -> f64 {
        self.base.distance(self.rows[i], self.rows[j])
    }
}
