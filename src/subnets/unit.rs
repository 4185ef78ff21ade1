//! Memory-backed subnet shell shared by the built-in specialists.

use super::{Subnet, SubnetDeps, SubnetOutput, SubnetParams};
use crate::models::{MemorySample, Mode};
use crate::storage::MemoryLog;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The transformation a built-in subnet performs.
pub trait Specialist: Default + Send + Sync {
    /// Registry name.
    const NAME: &'static str;

    /// File stem of the default memory log location.
    const MEMORY_STEM: &'static str;

    /// Produces a candidate and feature vector.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter call fails.
    fn run(
        &self,
        deps: &SubnetDeps,
        memory: &MemoryView<'_>,
        text: &str,
        context: &str,
    ) -> Result<SubnetOutput>;
}

/// Read access to a subnet's memory log.
///
/// The lock is taken per lookup, never for a whole specialist run.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    log: &'a RwLock<MemoryLog>,
}

impl<'a> MemoryView<'a> {
    /// Wraps a shared memory log.
    #[must_use]
    pub const fn new(log: &'a RwLock<MemoryLog>) -> Self {
        Self { log }
    }

    /// Returns the most recent sample whose source equals `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log's lock is poisoned.
    pub fn lookup(&self, source: &str) -> Result<Option<MemorySample>> {
        let log = self
            .log
            .read()
            .map_err(|e| Error::failed("read_memory_log", e))?;
        Ok(log.lookup(source).cloned())
    }
}

/// Serialized subnet state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UnitState {
    name: String,
    max_size: usize,
}

/// Subnet owning one memory log and delegating processing to a [`Specialist`].
pub struct MemoryBackedSubnet<S: Specialist> {
    specialist: S,
    deps: SubnetDeps,
    memory: RwLock<MemoryLog>,
    training: AtomicBool,
}

impl<S: Specialist> MemoryBackedSubnet<S> {
    /// Creates the subnet, restoring its memory log from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted memory log cannot be read.
    pub fn new(deps: SubnetDeps, params: &SubnetParams) -> Result<Self> {
        let memory = match params.resolve_memory_path(&deps, S::MEMORY_STEM) {
            Some(path) => MemoryLog::open(path, params.max_size, params.auto_persist)?,
            None => MemoryLog::new(params.max_size).with_auto_persist(params.auto_persist),
        };

        tracing::debug!(
            subnet = S::NAME,
            memory_path = ?memory.path(),
            restored = memory.len(),
            "Created subnet"
        );

        Ok(Self {
            specialist: S::default(),
            deps,
            memory: RwLock::new(memory),
            training: AtomicBool::new(false),
        })
    }

    /// Creates the subnet from a configuration params map.
    ///
    /// # Errors
    ///
    /// Returns an error if the params are invalid or the memory log cannot be
    /// restored.
    pub fn from_params(deps: SubnetDeps, params: &serde_json::Value) -> Result<Self> {
        Self::new(deps, &SubnetParams::from_value(params)?)
    }

    /// Returns the current execution mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.training.load(Ordering::Relaxed) {
            Mode::Training
        } else {
            Mode::Inference
        }
    }

    fn read_memory(&self) -> Result<RwLockReadGuard<'_, MemoryLog>> {
        self.memory
            .read()
            .map_err(|e| Error::failed("read_memory_log", e))
    }

    fn write_memory(&self) -> Result<RwLockWriteGuard<'_, MemoryLog>> {
        self.memory
            .write()
            .map_err(|e| Error::failed("write_memory_log", e))
    }
}

impl<S: Specialist> Subnet for MemoryBackedSubnet<S> {
    fn name(&self) -> &str {
        S::NAME
    }

    fn process(&self, text: &str, context: &str) -> Result<SubnetOutput> {
        self.specialist
            .run(&self.deps, &MemoryView::new(&self.memory), text, context)
    }

    fn update_memory(&self, samples: &[MemorySample]) -> Result<()> {
        self.write_memory()?.append(samples)
    }

    fn recent_memory(&self, n: usize) -> Result<Vec<MemorySample>> {
        Ok(self.read_memory()?.recent(n))
    }

    fn memory_path(&self) -> Option<PathBuf> {
        // The path is fixed at construction, so a poisoned guard still holds it.
        let log = self.memory.read().unwrap_or_else(PoisonError::into_inner);
        log.path().map(PathBuf::from)
    }

    fn set_mode(&self, mode: Mode) {
        self.training.store(mode.is_training(), Ordering::Relaxed);
    }

    fn state(&self) -> Result<serde_json::Value> {
        let state = UnitState {
            name: S::NAME.to_string(),
            max_size: self.read_memory()?.max_size(),
        };
        serde_json::to_value(state).map_err(|e| Error::failed("subnet_state", e))
    }

    fn load_state(&self, state: &serde_json::Value) -> Result<()> {
        let stored: UnitState = serde_json::from_value(state.clone())
            .map_err(|e| Error::InvalidInput(format!("subnet state: {e}")))?;
        if stored.name != S::NAME {
            return Err(Error::InvalidInput(format!(
                "subnet state for '{}' cannot be loaded into '{}'",
                stored.name,
                S::NAME
            )));
        }
        Ok(())
    }
}
