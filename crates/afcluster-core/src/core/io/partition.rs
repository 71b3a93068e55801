use crate::core::io::a3m::{A3mError, A3mFile};
use crate::core::io::traits::SequenceFile;
use crate::core::models::alignment::Alignment;
use crate::core::models::assignment::ClusterAssignment;
use crate::core::models::record::Record;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// A cluster file that has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenPartition {
    pub cluster_id: i32,
    pub path: PathBuf,
    /// Records in the file, the query included.
    pub num_records: usize,
}

/// Output path for one cluster: `<dir>/<keyword>_<id:03>.a3m`.
pub fn partition_path(dir: &Path, keyword: &str, cluster_id: i32) -> PathBuf {
    dir.join(format!("{}_{:03}.a3m", keyword, cluster_id))
}

/// The query followed by every member labelled `cluster_id`, in alignment order.
pub fn partition<'a>(
    alignment: &'a Alignment,
    assignment: &ClusterAssignment,
    cluster_id: i32,
) -> Vec<&'a Record> {
    debug_assert_eq!(assignment.labels().len(), alignment.num_members());
    let members = alignment.members();
    std::iter::once(alignment.query())
        .chain(assignment.members_of(cluster_id).map(|i| &members[i]))
        .collect()
}

/// Writes a single cluster partition, creating `dir` if needed.
pub fn write_partition(
    alignment: &Alignment,
    assignment: &ClusterAssignment,
    cluster_id: i32,
    keyword: &str,
    dir: &Path,
) -> Result<WrittenPartition, A3mError> {
    fs::create_dir_all(dir)?;
    let records = partition(alignment, assignment, cluster_id);
    let path = partition_path(dir, keyword, cluster_id);
    A3mFile::write_to_path(records.iter().copied(), &path)?;
    info!("Wrote {} (n={})", path.display(), records.len());
    Ok(WrittenPartition {
        cluster_id,
        path,
        num_records: records.len(),
    })
}

/// Writes one file per cluster id in `assignment`.
pub fn write_partitions(
    alignment: &Alignment,
    assignment: &ClusterAssignment,
    keyword: &str,
    dir: &Path,
) -> Result<Vec<WrittenPartition>, A3mError> {
    assignment
        .cluster_ids()
        .iter()
        .map(|&id| write_partition(alignment, assignment, id, keyword, dir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_alignment() -> Alignment {
        Alignment::new(vec![
            Record::new("query", "ACDEF"),
            Record::new("a", "ACDEF"),
            Record::new("b", "AC-EF"),
            Record::new("c", "ACDEw-F"),
            Record::new("d", "GGDEF"),
        ])
        .unwrap()
    }

    #[test]
    fn partition_path_zero_pads_cluster_id() {
        let dir = Path::new("/tmp/clusters");
        assert_eq!(
            partition_path(dir, "job", 7),
            PathBuf::from("/tmp/clusters/job_007.a3m")
        );
        assert_eq!(
            partition_path(dir, "job", 1234),
            PathBuf::from("/tmp/clusters/job_1234.a3m")
        );
    }

    #[test]
    fn partition_starts_with_query_and_contains_only_matching_labels() {
        let aln = sample_alignment();
        let assignment = ClusterAssignment::new(vec![0, 1, 0, -1], 1.0);

        let zero: Vec<_> = partition(&aln, &assignment, 0)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(zero, vec!["query", "a", "c"]);

        let one: Vec<_> = partition(&aln, &assignment, 1)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(one, vec!["query", "b"]);
    }

    #[test]
    fn write_partitions_creates_directory_and_one_file_per_cluster() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("nested").join("clusters");
        let aln = sample_alignment();
        let assignment = ClusterAssignment::new(vec![2, 0, 2, -1], 1.0);

        let written = write_partitions(&aln, &assignment, "job", &out_dir).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].cluster_id, 0);
        assert_eq!(written[0].num_records, 2);
        assert_eq!(written[1].cluster_id, 2);
        assert_eq!(written[1].num_records, 3);

        let content = fs::read_to_string(out_dir.join("job_002.a3m")).unwrap();
        assert_eq!(content, ">query\nACDEF\n>a\nACDEF\n>c\nACDEw-F\n");
        assert!(!out_dir.join("job_-01.a3m").exists());
    }

    #[test]
    fn write_partitions_with_no_clusters_writes_nothing() {
        let dir = tempdir().unwrap();
        let aln = sample_alignment();
        let assignment = ClusterAssignment::new(vec![-1; 4], 1.0);
        let written = write_partitions(&aln, &assignment, "job", dir.path()).unwrap();
        assert!(written.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
