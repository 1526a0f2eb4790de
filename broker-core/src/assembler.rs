//! `MultiOriginAssembler` owns the per-job output file(s),
//! writing each delivered result at the byte offset its task ID
//! determines, with no lookup table required.

use crate::delta;
use crate::error::BrokerError;
use async_trait::async_trait;
use broker_common::ids::JobId;
use broker_propagator::{RegionalWorkResult, TaskTemplate};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const BYTES_PER_INT: u64 = 4;

/// Durable handoff for finalized result files.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn move_into_storage(&self, key: &str, local_file: &Path) -> Result<(), String>;
}

/// Reference implementation: just renames into a destination directory.
/// Adequate for single-node deployments and tests; a production store
/// would instead stream to object storage.
pub struct LocalFileStorage {
    destination_dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            destination_dir: destination_dir.into(),
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn move_into_storage(&self, key: &str, local_file: &Path) -> Result<(), String> {
        std::fs::create_dir_all(&self.destination_dir)
            .map_err(|err| format!("failed to create destination dir: {err}"))?;
        let destination = self.destination_dir.join(key);
        std::fs::rename(local_file, &destination)
            .map_err(|err| format!("failed to move {key} into storage: {err}"))
    }
}

struct GridFile {
    file: Mutex<File>,
    path: PathBuf,
    row_width: u64,
}

impl GridFile {
    fn create(path: PathBuf, n_tasks_total: u32, row_width: u64) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(n_tasks_total as u64 * row_width * BYTES_PER_INT)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
            row_width,
        })
    }

    fn write_row(&self, task_id: u32, row: &[i32]) -> std::io::Result<()> {
        debug_assert_eq!(row.len() as u64, self.row_width);
        let offset = task_id as u64 * self.row_width * BYTES_PER_INT;
        let mut bytes = Vec::with_capacity(row.len() * BYTES_PER_INT as usize);
        for v in row {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&bytes)
    }

    /// Reads every row back (in task-id order) for finalization, applying
    /// delta encoding if requested.
    fn finalize_bytes(&self, n_tasks_total: u32, delta_encode: bool) -> std::io::Result<Vec<u8>> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(0))?;
        let mut raw = vec![0u8; n_tasks_total as usize * self.row_width as usize * BYTES_PER_INT as usize];
        file.read_exact(&mut raw)?;

        if !delta_encode {
            return Ok(raw);
        }

        let mut out = Vec::with_capacity(raw.len());
        for row_bytes in raw.chunks(self.row_width as usize * BYTES_PER_INT as usize) {
            let row: Vec<i32> = row_bytes
                .chunks_exact(4)
                .map(|b| i32::from_le_bytes(b.try_into().unwrap()))
                .collect();
            for v in delta::encode_row(&row) {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        Ok(out)
    }
}

/// Per-job assembler. Created alongside the `Job`; destroyed on delete
/// or natural completion.
pub struct MultiOriginAssembler {
    job_id: JobId,
    n_tasks_total: u32,
    n_percentiles: usize,
    destination_count: usize,
    delta_encode: bool,
    travel_times: Option<GridFile>,
    accessibility: Option<GridFile>,
    written: Mutex<Vec<bool>>,
}

impl MultiOriginAssembler {
    pub fn create(
        job_id: JobId,
        template: &TaskTemplate,
        n_tasks_total: u32,
        work_dir: &Path,
        wants_travel_times: bool,
        delta_encode: bool,
    ) -> std::io::Result<Self> {
        let n_percentiles = template.analysis.percentiles.len();
        let destination_count = template.grid.destination_count().max(1);
        let wants_accessibility = template.analysis.destination_opportunity_counts.is_some();

        let travel_times = wants_travel_times
            .then(|| {
                GridFile::create(
                    work_dir.join(format!("{job_id}.traveltimes.tmp")),
                    n_tasks_total,
                    (destination_count * n_percentiles) as u64,
                )
            })
            .transpose()?;

        let accessibility = wants_accessibility
            .then(|| {
                GridFile::create(
                    work_dir.join(format!("{job_id}.accessibility.tmp")),
                    n_tasks_total,
                    n_percentiles as u64,
                )
            })
            .transpose()?;

        Ok(Self {
            job_id,
            n_tasks_total,
            n_percentiles,
            destination_count,
            delta_encode,
            travel_times,
            accessibility,
            written: Mutex::new(vec![false; n_tasks_total as usize]),
        })
    }

    /// Validates shape and writes at the deterministic offset. A
    /// redelivered task with identical content writes the same bytes
    /// again; this is a safe, idempotent overwrite.
    pub fn handle_message(&self, result: &RegionalWorkResult) -> Result<(), BrokerError> {
        if let Some(ref grid) = self.travel_times {
            let Some(ref travel_times) = result.travel_times else {
                return Err(malformed(self.job_id, result.task_id, "missing travel times"));
            };
            if travel_times.len() != self.destination_count {
                return Err(malformed(
                    self.job_id,
                    result.task_id,
                    format!(
                        "expected {} destinations, got {}",
                        self.destination_count,
                        travel_times.len()
                    ),
                ));
            }
            let mut row = Vec::with_capacity(self.destination_count * self.n_percentiles);
            for per_destination in travel_times {
                if per_destination.len() != self.n_percentiles {
                    return Err(malformed(
                        self.job_id,
                        result.task_id,
                        format!(
                            "expected {} percentiles, got {}",
                            self.n_percentiles,
                            per_destination.len()
                        ),
                    ));
                }
                row.extend_from_slice(per_destination);
            }
            grid.write_row(result.task_id, &row)
                .map_err(|err| io_error(self.job_id, err))?;
        }

        if let Some(ref grid) = self.accessibility {
            let Some(ref accessibility) = result.accessibility else {
                return Err(malformed(self.job_id, result.task_id, "missing accessibility"));
            };
            let row = &accessibility
                .first()
                .and_then(|datasets| datasets.first())
                .cloned()
                .unwrap_or_default();
            if row.len() != self.n_percentiles {
                return Err(malformed(
                    self.job_id,
                    result.task_id,
                    format!(
                        "expected {} accessibility percentiles, got {}",
                        self.n_percentiles,
                        row.len()
                    ),
                ));
            }
            let row_i32: Vec<i32> = row.iter().map(|&v| v as i32).collect();
            grid.write_row(result.task_id, &row_i32)
                .map_err(|err| io_error(self.job_id, err))?;
        }

        if let Some(slot) = self.written.lock().unwrap().get_mut(result.task_id as usize) {
            *slot = true;
        }
        Ok(())
    }

    pub fn all_written(&self) -> bool {
        self.written.lock().unwrap().iter().all(|&w| w)
    }

    /// Flushes and returns `(storage-key, local-file)` pairs for the
    /// Broker to hand to `FileStorage`.
    pub fn finalize(&self) -> std::io::Result<HashMap<String, PathBuf>> {
        let mut out = HashMap::new();
        if let Some(ref grid) = self.travel_times {
            let bytes = grid.finalize_bytes(self.n_tasks_total, self.delta_encode)?;
            let finalized_path = grid.path.with_extension("bin");
            std::fs::write(&finalized_path, bytes)?;
            out.insert(format!("{}/traveltimes.bin", self.job_id), finalized_path);
        }
        if let Some(ref grid) = self.accessibility {
            let bytes = grid.finalize_bytes(self.n_tasks_total, self.delta_encode)?;
            let finalized_path = grid.path.with_extension("bin");
            std::fs::write(&finalized_path, bytes)?;
            out.insert(format!("{}/accessibility.bin", self.job_id), finalized_path);
        }
        Ok(out)
    }

    /// Closes handles and deletes temporary files.
    pub fn terminate(&self) {
        for grid in [&self.travel_times, &self.accessibility].into_iter().flatten() {
            let _ = std::fs::remove_file(&grid.path);
            let _ = std::fs::remove_file(grid.path.with_extension("bin"));
        }
    }
}

fn malformed(job_id: JobId, task_id: u32, reason: impl Into<String>) -> BrokerError {
    BrokerError::MalformedResult {
        job_id,
        task_id,
        reason: reason.into(),
    }
}

fn io_error(job_id: JobId, err: std::io::Error) -> BrokerError {
    BrokerError::AssemblerIoError {
        job_id,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_propagator::{AnalysisTask, GridDimensions, IterationSource};

    fn template(destination_count: u32, n_percentiles: usize, accessibility: bool) -> TaskTemplate {
        TaskTemplate {
            grid: GridDimensions {
                width: destination_count,
                height: 1,
            },
            analysis: AnalysisTask {
                percentiles: vec![50; n_percentiles],
                cutoff_seconds: 600,
                iteration_source: IterationSource::MonteCarlo { draws: 1 },
                destination_opportunity_counts: accessibility.then(|| vec![1; destination_count as usize]),
            },
        }
    }

    #[test]
    fn writes_land_at_deterministic_offsets_and_survive_redelivery() {
        let dir = tempfile::tempdir().unwrap();
        let job_id = JobId::new();
        let template = template(2, 1, false);
        let assembler =
            MultiOriginAssembler::create(job_id, &template, 3, dir.path(), true, false).unwrap();

        let result = RegionalWorkResult::success(job_id, 1, vec![vec![4], vec![9]], None);
        assembler.handle_message(&result).unwrap();
        // Redelivery: identical content written again must be a no-op.
        assembler.handle_message(&result).unwrap();

        assert!(!assembler.all_written());
        let result0 = RegionalWorkResult::success(job_id, 0, vec![vec![1], vec![2]], None);
        let result2 = RegionalWorkResult::success(job_id, 2, vec![vec![5], vec![6]], None);
        assembler.handle_message(&result0).unwrap();
        assembler.handle_message(&result2).unwrap();
        assert!(assembler.all_written());

        let files = assembler.finalize().unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn malformed_shape_is_rejected_without_poisoning_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let job_id = JobId::new();
        let template = template(2, 1, false);
        let assembler =
            MultiOriginAssembler::create(job_id, &template, 1, dir.path(), true, false).unwrap();

        let bad = RegionalWorkResult::success(job_id, 0, vec![vec![1]], None);
        let err = assembler.handle_message(&bad).unwrap_err();
        assert!(matches!(err, BrokerError::MalformedResult { .. }));
        assert!(!assembler.all_written());
    }

    #[test]
    fn accessibility_grid_records_the_dataset_zero_cutoff_zero_row() {
        let dir = tempfile::tempdir().unwrap();
        let job_id = JobId::new();
        let template = template(1, 3, true);
        let assembler =
            MultiOriginAssembler::create(job_id, &template, 1, dir.path(), false, false).unwrap();

        let result = RegionalWorkResult::success(
            job_id,
            0,
            vec![vec![1, 2, 3]],
            Some(vec![vec![vec![9, 8, 7]]]),
        );
        assembler.handle_message(&result).unwrap();
        assert!(assembler.all_written());
    }
}
