pub mod cluster;
pub mod fetch;
pub mod run;

use afcluster::workflows::cluster::ClusterRunSummary;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

/// Seeded when a seed is configured, from entropy otherwise.
pub(crate) fn sampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            info!("Seeding the radius search with {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

pub(crate) fn print_cluster_summary(summary: &ClusterRunSummary) {
    println!(
        "Clustered {} of {} member(s) into {} cluster(s) at radius {:.2} ({} noise).",
        summary.num_filtered_members,
        summary.num_members,
        summary.partitions.len(),
        summary.radius,
        summary.num_noise
    );
    for partition in &summary.partitions {
        println!(
            "  ✓ {} ({} sequences)",
            partition.path.display(),
            partition.num_records
        );
    }
}
