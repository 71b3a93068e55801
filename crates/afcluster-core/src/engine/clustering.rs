use super::config::ClusteringConfig;
use super::dbscan::dbscan;
use super::distance::PairwiseDistances;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::radius::{RadiusSelection, select_radius};
use crate::core::encoding::{EncodedMatrix, encode_sequences};
use crate::core::models::alignment::Alignment;
use crate::core::models::assignment::ClusterAssignment;
use rand::Rng;
use tracing::{info, instrument, warn};

/// Distance tables above this size are logged as a warning before they are allocated.
pub const LARGE_DISTANCE_TABLE_BYTES: u64 = 1 << 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
    pub assignment: ClusterAssignment,
    pub selection: RadiusSelection,
}

/// Clusters the rows of an already encoded matrix.
///
/// The radius comes from `config.radius` or, when unset, from the automatic search. The final
/// labelling always covers every row.
pub fn cluster_encoded(
    matrix: &EncodedMatrix,
    config: &ClusteringConfig,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<ClusterOutcome, EngineError> {
    let table_bytes = PairwiseDistances::table_bytes(matrix.num_rows());
    if table_bytes > LARGE_DISTANCE_TABLE_BYTES {
        warn!(
            members = matrix.num_rows(),
            mib = table_bytes >> 20,
            "Pairwise distance table is large; consider a stricter gap cutoff"
        );
    }
    reporter.status("computing pairwise distances");
    let distances = PairwiseDistances::from_matrix(matrix);

    let selection = select_radius(&distances, config, rng, reporter)?;

    reporter.report(Progress::PhaseStart {
        name: "Clustering",
    });
    let labels = dbscan(&distances, selection.radius, config.min_points);
    reporter.report(Progress::PhaseFinish);

    let assignment = ClusterAssignment::new(labels, selection.radius);
    Ok(ClusterOutcome {
        assignment,
        selection,
    })
}

/// Encodes and clusters the members of `alignment`; the query is never clustered.
///
/// Members are encoded from their cleaned sequences over the alignment width.
#[instrument(skip_all, name = "cluster_alignment")]
pub fn cluster_alignment(
    alignment: &Alignment,
    config: &ClusteringConfig,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<ClusterOutcome, EngineError> {
    let sequences = alignment.member_sequences();
    let matrix = encode_sequences(&sequences, alignment.width(), &config.alphabet);
    info!(
        members = matrix.num_rows(),
        features = matrix.num_cols(),
        "Encoded alignment members"
    );

    let outcome = cluster_encoded(&matrix, config, rng, reporter)?;
    info!(
        "Found {} clusters using dbscan",
        outcome.assignment.num_clusters()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::assignment::NOISE;
    use crate::core::models::record::Record;
    use crate::engine::config::ClusteringConfigBuilder;
    use crate::engine::radius::RadiusStrategy;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn alignment(members: &[&str]) -> Alignment {
        let mut records = vec![Record::new("query", members.first().copied().unwrap_or("A"))];
        records.extend(
            members
                .iter()
                .enumerate()
                .map(|(i, s)| Record::new(format!("{}", 101 + i), *s)),
        );
        Alignment::new(records).unwrap()
    }

    #[test]
    fn ten_sequences_with_small_fixed_radius_label_every_member() {
        let aln = alignment(&[
            "ACDEF", "ACDEF", "ACDEG", "ACDEG", "MKVLA", "MKVLA", "MKVLA", "WWYYW", "ACDEF",
            "PPPPP",
        ]);
        let config = ClusteringConfigBuilder::new()
            .min_points(2)
            .radius(Some(0.5))
            .build()
            .unwrap();

        let outcome = cluster_alignment(
            &aln,
            &config,
            &mut StdRng::seed_from_u64(0),
            &ProgressReporter::new(),
        )
        .unwrap();

        let assignment = &outcome.assignment;
        assert_eq!(assignment.labels().len(), 10);
        assert!(!assignment.cluster_ids().contains(&NOISE));
        assert_eq!(assignment.cluster_ids(), &[0, 1, 2]);
        assert_eq!(assignment.labels()[7], NOISE);
        assert_eq!(assignment.labels()[9], NOISE);
        assert_eq!(assignment.labels()[0], assignment.labels()[8]);
        assert_eq!(outcome.selection.strategy, RadiusStrategy::Fixed);
    }

    #[test]
    fn alignment_without_members_gives_empty_assignment() {
        let aln = Alignment::new(vec![Record::new("query", "ACDE")]).unwrap();
        let config = ClusteringConfig::default();
        let outcome = cluster_alignment(
            &aln,
            &config,
            &mut StdRng::seed_from_u64(0),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(outcome.assignment.labels().is_empty());
        assert!(outcome.assignment.cluster_ids().is_empty());
    }

    #[test]
    fn automatic_radius_separates_distinct_families() {
        let mut members = Vec::new();
        for i in 0..10 {
            let mut a: Vec<char> = "AAAAAAAAAAAAAAAAAAAAAAAA".chars().collect();
            a[i] = 'C';
            members.push(a.into_iter().collect::<String>());
            let mut w: Vec<char> = "WWWWWWWWWWWWWWWWWWWWWWWW".chars().collect();
            w[i] = 'Y';
            members.push(w.into_iter().collect::<String>());
        }
        let refs: Vec<&str> = members.iter().map(String::as_str).collect();
        let aln = alignment(&refs);
        let config = ClusteringConfigBuilder::new()
            .min_points(3)
            .search_range(1.0, 3.0, 0.5)
            .build()
            .unwrap();

        let outcome = cluster_alignment(
            &aln,
            &config,
            &mut StdRng::seed_from_u64(5),
            &ProgressReporter::new(),
        )
        .unwrap();

        let labels = outcome.assignment.labels();
        assert_eq!(labels.len(), 20);
        assert!(outcome.assignment.radius() >= 1.0);
        assert_eq!(outcome.assignment.num_clusters(), 2);
        assert!(labels.iter().step_by(2).all(|&l| l == labels[0]));
        assert!(labels.iter().skip(1).step_by(2).all(|&l| l == labels[1]));
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn same_seed_reproduces_labels() {
        let aln = alignment(&[
            "ACDEF", "ACDEG", "ACDFF", "MKVLA", "MKVLC", "MKVIA", "WWYYW", "ACDEF",
        ]);
        let config = ClusteringConfigBuilder::new()
            .min_points(2)
            .search_range(0.5, 3.0, 0.5)
            .build()
            .unwrap();
        let run = || {
            cluster_alignment(
                &aln,
                &config,
                &mut StdRng::seed_from_u64(99),
                &ProgressReporter::new(),
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }
}
