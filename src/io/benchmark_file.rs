// src/io/benchmark_file.rs

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::simulation::benchmark::{Benchmark, BenchmarkError, BenchmarkStore};

/// Benchmarks kept in one JSON file, keyed by config hash.
///
/// The whole map is loaded on open and rewritten on every accepted
/// improvement. The in-memory map only changes once the write succeeds.
#[derive(Debug)]
pub struct JsonFileBenchmarkStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, Benchmark>>,
}

impl JsonFileBenchmarkStore {
    /// Opens `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BenchmarkError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), entries = entries.len(), "benchmark file opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BenchmarkStore for JsonFileBenchmarkStore {
    fn get(&self, config_hash: &str) -> Result<Option<Benchmark>, BenchmarkError> {
        Ok(self.entries.lock().get(config_hash).cloned())
    }

    fn offer(&self, candidate: Benchmark) -> Result<bool, BenchmarkError> {
        let mut entries = self.entries.lock();
        if !candidate.improves_on(entries.get(&candidate.config_hash)) {
            return Ok(false);
        }

        let mut updated = entries.clone();
        updated.insert(candidate.config_hash.clone(), candidate);
        std::fs::write(&self.path, serde_json::to_vec_pretty(&updated)?)?;
        *entries = updated;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::benchmark::config_hash;
    use crate::simulation::config::GameConfig;
    use crate::simulation::engine::optimal_costs;
    use crate::simulation::session::GameId;

    #[test]
    fn improvements_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("benchmarks.json");
        let config = GameConfig { total_rounds: 10, ..GameConfig::default() }.validated().unwrap();
        let hash = config_hash(&config).unwrap();
        let result = optimal_costs(&config).unwrap();
        let best = result.total_chain_cost;

        let store = JsonFileBenchmarkStore::open(&path).unwrap();
        assert!(store.get(&hash).unwrap().is_none());
        let mut worse = result.clone();
        worse.total_chain_cost = best + 10.0;
        assert!(store.offer(Benchmark::from_result(hash.clone(), GameId::new("BEER-1"), worse)).unwrap());
        assert!(store.offer(Benchmark::from_result(hash.clone(), GameId::new("BEER-2"), result)).unwrap());
        drop(store);

        let reopened = JsonFileBenchmarkStore::open(&path).unwrap();
        let stored = reopened.get(&hash).unwrap().unwrap();
        assert_eq!(stored.total_chain_cost, best);
        assert_eq!(stored.game, GameId::new("BEER-2"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("benchmarks.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileBenchmarkStore::open(&path),
            Err(BenchmarkError::Json(_))
        ));
    }
}
