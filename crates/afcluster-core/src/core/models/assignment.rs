/// Label given to records that belong to no cluster.
pub const NOISE: i32 = -1;

/// Per-member cluster labels of an alignment.
///
/// `labels[i]` belongs to the `i`-th non-query record. `cluster_ids` holds the distinct
/// non-negative labels in ascending order; noise is never listed there.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    labels: Vec<i32>,
    cluster_ids: Vec<i32>,
    radius: f64,
}

impl ClusterAssignment {
    pub fn new(labels: Vec<i32>, radius: f64) -> Self {
        let mut cluster_ids: Vec<i32> = labels.iter().copied().filter(|&l| l >= 0).collect();
        cluster_ids.sort_unstable();
        cluster_ids.dedup();
        Self {
            labels,
            cluster_ids,
            radius,
        }
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn cluster_ids(&self) -> &[i32] {
        &self.cluster_ids
    }

    /// The neighbourhood radius the labels were produced with.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn num_clusters(&self) -> usize {
        self.cluster_ids.len()
    }

    pub fn num_noise(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// Member indices carrying `cluster_id`, in member order.
    pub fn members_of(&self, cluster_id: i32) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |&(_, &l)| l == cluster_id)
            .map(|(i, _)| i)
    }
}
