//! Reference data adapter: CSV training table and the process-wide sample cache.
//!
//! The attribution background is a fixed-size random subsample of the
//! training feature table, drawn once with a fixed seed and reused for every
//! request. `ReferenceCache` holds it.
//!
//! # Initialization race
//!
//! The cache is a `OnceLock`. Concurrent first callers may each load the
//! table (duplicate work), but only the first finished sample is published
//! and every caller returns that one. A sample is published whole or not at
//! all. Load failures are not cached, so a later request can retry once the
//! file is in place.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::ScreeningConfig;
use crate::domain::{FeatureVector, ReferenceSample};
use crate::ports::ReferenceSource;
use crate::ScreeningError;

fn unavailable(path: &Path, reason: impl std::fmt::Display) -> ScreeningError {
    ScreeningError::ExplainerUnavailable(format!(
        "cannot read reference data {}: {reason}",
        path.display()
    ))
}

/// Read the full training feature table, dropping the target column.
///
/// # Errors
/// `ExplainerUnavailable` on I/O or parse failure; `SchemaMismatch` if the
/// remaining columns are not the training feature order.
pub fn read_feature_table(
    path: &Path,
    target_column: &str,
) -> Result<Vec<FeatureVector>, ScreeningError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| unavailable(path, e))?;

    let headers = reader.headers().map_err(|e| unavailable(path, e))?.clone();
    let target_idx = headers.iter().position(|h| h == target_column);
    let names: Vec<&str> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != target_idx)
        .map(|(_, h)| h)
        .collect();

    // Fail on the header before touching any rows.
    crate::domain::check_schema(&names, &crate::domain::FEATURE_NAMES)?;

    let mut rows = Vec::new();
    let mut values = Vec::with_capacity(names.len());
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| unavailable(path, e))?;
        values.clear();
        for (idx, field) in record.iter().enumerate() {
            if Some(idx) == target_idx {
                continue;
            }
            let v: f64 = field.parse().map_err(|_| {
                unavailable(
                    path,
                    format!("row {} column {idx}: '{field}' is not a number", line + 1),
                )
            })?;
            values.push(v);
        }
        rows.push(FeatureVector::from_named(&names, &values)?);
    }

    Ok(rows)
}

/// Draw `n` distinct rows with a seeded RNG.
///
/// Tables with at most `n` rows are returned whole, in file order.
#[must_use]
pub fn subsample(rows: Vec<FeatureVector>, n: usize, seed: u64) -> Vec<FeatureVector> {
    if rows.len() <= n {
        return rows;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, rows.len(), n)
        .into_iter()
        .map(|idx| rows[idx])
        .collect()
}

/// Reference sample drawn from the training CSV.
#[derive(Debug, Clone)]
pub struct CsvReferenceSource {
    path: PathBuf,
    target_column: String,
    sample_size: usize,
    seed: u64,
}

impl CsvReferenceSource {
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        target_column: impl Into<String>,
        sample_size: usize,
        seed: u64,
    ) -> Self {
        Self {
            path: path.into(),
            target_column: target_column.into(),
            sample_size,
            seed,
        }
    }

    #[must_use]
    pub fn from_config(config: &ScreeningConfig) -> Self {
        Self::new(
            config.reference_path(),
            config.target_column.clone(),
            config.reference_sample_size,
            config.seed,
        )
    }
}

impl ReferenceSource for CsvReferenceSource {
    fn load(&self) -> Result<ReferenceSample, ScreeningError> {
        let table = read_feature_table(&self.path, &self.target_column)?;
        if table.is_empty() {
            return Err(unavailable(&self.path, "table has no rows"));
        }
        let total = table.len();
        let rows = subsample(table, self.sample_size, self.seed);
        tracing::info!(
            "Drew {} of {} reference rows from {:?} (seed={})",
            rows.len(),
            total,
            self.path,
            self.seed
        );
        Ok(ReferenceSample::new(rows))
    }

    fn cache_key(&self) -> String {
        format!(
            "{}#{}?n={}&seed={}",
            self.path.display(),
            self.target_column,
            self.sample_size,
            self.seed
        )
    }
}

/// Lazily initialized, read-only holder of the reference sample.
///
/// The first source to load publishes its sample together with its
/// [`ReferenceSource::cache_key`]. A source with a different key is served
/// from its own uncached load, so sharing a cache across sources never hands
/// out another source's sample.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    cell: OnceLock<(String, Arc<ReferenceSample>)>,
}

impl ReferenceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached sample, if already initialized.
    #[must_use]
    pub fn get(&self) -> Option<Arc<ReferenceSample>> {
        self.cell.get().map(|(_, sample)| Arc::clone(sample))
    }

    /// Key of the source that filled the cache.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.cell.get().map(|(key, _)| key.as_str())
    }

    /// Return the cached sample, loading it from `source` on first use.
    ///
    /// # Errors
    /// Propagates the source's load error; nothing is cached in that case.
    pub fn get_or_load(
        &self,
        source: &dyn ReferenceSource,
    ) -> Result<Arc<ReferenceSample>, ScreeningError> {
        let key = source.cache_key();
        if let Some((cached, sample)) = self.cell.get() {
            if *cached == key {
                return Ok(Arc::clone(sample));
            }
            tracing::warn!("Reference cache holds another source ({cached}); loading {key} uncached");
            return Ok(Arc::new(source.load()?));
        }

        let loaded = Arc::new(source.load()?);
        if self.cell.set((key.clone(), Arc::clone(&loaded))).is_err() {
            tracing::debug!("Reference sample already initialized by another caller");
        }
        // First writer wins for callers with the same key.
        Ok(match self.cell.get() {
            Some((cached, sample)) if *cached == key => Arc::clone(sample),
            _ => loaded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FEATURE_COUNT, FEATURE_NAMES};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn write_table(path: &Path, rows: usize) {
        let mut file = std::fs::File::create(path).unwrap();
        let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
        header.push("heartdisease");
        writeln!(file, "{}", header.join(",")).unwrap();
        for r in 0..rows {
            let mut fields: Vec<String> = (0..FEATURE_COUNT)
                .map(|c| format!("{}", (r * FEATURE_COUNT + c) as f64 / 10.0))
                .collect();
            fields.push((r % 2).to_string());
            writeln!(file, "{}", fields.join(",")).unwrap();
        }
    }

    #[test]
    fn test_read_table_drops_target() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("train.csv");
        write_table(&path, 3);

        let rows = read_feature_table(&path, "heartdisease").expect("read");
        assert_eq!(rows.len(), 3);
        assert!((rows[1].age - 1.5).abs() < 1e-12);
        assert!((rows[1].cholesterol_missing - 2.9).abs() < 1e-12);
    }

    #[test]
    fn test_target_column_position_does_not_matter() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("train.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        let mut header = vec!["heartdisease"];
        header.extend(FEATURE_NAMES);
        writeln!(file, "{}", header.join(",")).unwrap();
        let mut row = vec!["1".to_string()];
        row.extend((0..FEATURE_COUNT).map(|c| c.to_string()));
        writeln!(file, "{}", row.join(",")).unwrap();
        drop(file);

        let rows = read_feature_table(&path, "heartdisease").expect("read");
        assert_eq!(rows[0].to_array()[14], 14.0);
    }

    #[test]
    fn test_reordered_header_is_schema_mismatch() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("train.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
        header.swap(7, 8);
        writeln!(file, "{}", header.join(",")).unwrap();
        drop(file);

        let err = read_feature_table(&path, "heartdisease").expect_err("must fail");
        assert!(matches!(err, ScreeningError::SchemaMismatch(_)));
    }

    #[test]
    fn test_missing_file_is_explainer_unavailable() {
        let err = read_feature_table(Path::new("/nonexistent/train.csv"), "heartdisease")
            .expect_err("must fail");
        assert!(matches!(err, ScreeningError::ExplainerUnavailable(_)));
    }

    #[test]
    fn test_non_numeric_cell_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("train.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{},heartdisease", FEATURE_NAMES.join(",")).unwrap();
        let mut row: Vec<String> = (0..FEATURE_COUNT).map(|c| c.to_string()).collect();
        row[3] = "yes".into();
        writeln!(file, "{},0", row.join(",")).unwrap();
        drop(file);

        let err = read_feature_table(&path, "heartdisease").expect_err("must fail");
        assert!(err.to_string().contains("'yes'"));
    }

    #[test]
    fn test_subsample_is_seeded_and_distinct() {
        let rows: Vec<FeatureVector> = (0..200)
            .map(|i| FeatureVector::from_array([i as f64; FEATURE_COUNT]))
            .collect();

        let a = subsample(rows.clone(), 50, 42);
        let b = subsample(rows.clone(), 50, 42);
        let c = subsample(rows.clone(), 50, 7);
        assert_eq!(a.len(), 50);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut ages: Vec<i64> = a.iter().map(|r| r.age as i64).collect();
        ages.sort_unstable();
        ages.dedup();
        assert_eq!(ages.len(), 50, "rows must be drawn without replacement");
    }

    #[test]
    fn test_small_tables_are_used_whole() {
        let rows: Vec<FeatureVector> = (0..10)
            .map(|i| FeatureVector::from_array([i as f64; FEATURE_COUNT]))
            .collect();
        assert_eq!(subsample(rows.clone(), 50, 42), rows);
    }

    #[test]
    fn test_csv_source_loads_are_identical() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("train.csv");
        write_table(&path, 120);

        let source = CsvReferenceSource::new(&path, "heartdisease", 50, 42);
        let first = source.load().expect("load");
        let second = source.load().expect("load");
        assert_eq!(first.len(), 50);
        assert_eq!(first, second);
    }

    struct CountingSource {
        loads: AtomicUsize,
        fail: bool,
    }

    impl ReferenceSource for CountingSource {
        fn load(&self) -> Result<ReferenceSample, ScreeningError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScreeningError::ExplainerUnavailable("offline".into()));
            }
            Ok(ReferenceSample::new(vec![FeatureVector::from_array(
                [1.0; FEATURE_COUNT],
            )]))
        }
    }

    #[test]
    fn test_cache_loads_once() {
        let cache = ReferenceCache::new();
        let source = CountingSource {
            loads: AtomicUsize::new(0),
            fail: false,
        };
        assert!(cache.get().is_none());

        let a = cache.get_or_load(&source).expect("load");
        let b = cache.get_or_load(&source).expect("load");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let cache = ReferenceCache::new();
        let failing = CountingSource {
            loads: AtomicUsize::new(0),
            fail: true,
        };
        assert!(cache.get_or_load(&failing).is_err());
        assert!(cache.get_or_load(&failing).is_err());
        assert_eq!(failing.loads.load(Ordering::SeqCst), 2);
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_concurrent_initializers_agree() {
        let cache = Arc::new(ReferenceCache::new());
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            fail: false,
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let source = Arc::clone(&source);
                std::thread::spawn(move || cache.get_or_load(source.as_ref()).expect("load"))
            })
            .collect();
        let samples: Vec<Arc<ReferenceSample>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let published = cache.get().expect("initialized");
        assert!(samples.iter().all(|s| Arc::ptr_eq(s, &published)));
        assert!(source.loads.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_cache_serves_each_source_its_own_sample() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("train.csv");
        write_table(&path, 120);

        let cache = ReferenceCache::new();
        let seed_42 = CsvReferenceSource::new(&path, "heartdisease", 50, 42);
        let seed_7 = CsvReferenceSource::new(&path, "heartdisease", 50, 7);
        let smaller = CsvReferenceSource::new(&path, "heartdisease", 10, 42);

        let first = cache.get_or_load(&seed_42).unwrap();
        let other_seed = cache.get_or_load(&seed_7).unwrap();
        let other_size = cache.get_or_load(&smaller).unwrap();

        assert_eq!(*other_seed, seed_7.load().unwrap());
        assert_ne!(*other_seed, *first);
        assert_eq!(other_size.len(), 10);
        assert_eq!(cache.key(), Some(seed_42.cache_key().as_str()));
        assert!(Arc::ptr_eq(&cache.get_or_load(&seed_42).unwrap(), &first));
    }
}
