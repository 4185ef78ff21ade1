//! Pipeline orchestrator.

use super::Checkpoint;
use crate::adapters::Adapter;
use crate::coordinators::Fuser;
use crate::models::{MemorySample, Mode};
use crate::observability::metrics as names;
use crate::subnets::{Subnet, SubnetOutput};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// An assembled, runnable pipeline.
///
/// Owns its adapter pair, its subnets in fixed order, and its fuser. The
/// subnet order decides fusion ties: the lowest index wins.
pub struct Pipeline {
    domain: String,
    source: Arc<dyn Adapter>,
    target: Arc<dyn Adapter>,
    subnets: Vec<Arc<dyn Subnet>>,
    fuser: Box<dyn Fuser>,
    mode: Mode,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("domain", &self.domain)
            .field("source", &self.source.language())
            .field("target", &self.target.language())
            .field("subnets", &self.subnet_names())
            .field("fuser", &self.fuser.name())
            .field("mode", &self.mode)
            .finish()
    }
}

impl Pipeline {
    /// Assembles a pipeline from resolved components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if there are no subnets or the fuser
    /// was built for a different subnet count or embedding width.
    pub fn new(
        domain: impl Into<String>,
        source: Arc<dyn Adapter>,
        target: Arc<dyn Adapter>,
        subnets: Vec<Arc<dyn Subnet>>,
        fuser: Box<dyn Fuser>,
    ) -> Result<Self> {
        if subnets.is_empty() {
            return Err(Error::InvalidConfig {
                key: "subnets".to_string(),
                reason: "must list at least one subnet".to_string(),
            });
        }
        if fuser.subnet_count() != subnets.len() {
            return Err(Error::InvalidConfig {
                key: "coordinator".to_string(),
                reason: format!(
                    "'{}' was built for {} subnets but the pipeline has {}",
                    fuser.name(),
                    fuser.subnet_count(),
                    subnets.len()
                ),
            });
        }
        if fuser.embed_dim() != source.embed_dim() {
            return Err(Error::InvalidConfig {
                key: "coordinator".to_string(),
                reason: format!(
                    "'{}' expects embed_dim {} but the source adapter produces {}",
                    fuser.name(),
                    fuser.embed_dim(),
                    source.embed_dim()
                ),
            });
        }

        Ok(Self {
            domain: domain.into(),
            source,
            target,
            subnets,
            fuser,
            mode: Mode::default(),
        })
    }

    /// Translates `text`, running every subnet in order on this thread.
    ///
    /// # Errors
    ///
    /// Returns the first subnet, adapter or fuser error.
    #[instrument(
        name = "octopus.pipeline.translate",
        skip(self, text, context),
        fields(
            domain = %self.domain,
            subnets = self.subnets.len(),
            text_len = text.len()
        )
    )]
    pub fn translate(&self, text: &str, context: &str) -> Result<String> {
        let start = Instant::now();
        let result = self
            .subnets
            .iter()
            .map(|subnet| subnet.process(text, context))
            .collect::<Result<Vec<_>>>()
            .and_then(|outputs| self.fuse(text, outputs));
        record_translate("sequential", start, result.is_ok());
        result
    }

    /// Translates `text`, running every subnet on its own blocking task.
    ///
    /// Results are joined in subnet order, so the output equals
    /// [`Pipeline::translate`]'s for the same input.
    ///
    /// # Errors
    ///
    /// Returns the first subnet error in subnet order, a task join failure,
    /// or a fuser error.
    #[instrument(
        name = "octopus.pipeline.translate_concurrent",
        skip(self, text, context),
        fields(
            domain = %self.domain,
            subnets = self.subnets.len(),
            text_len = text.len()
        )
    )]
    pub async fn translate_concurrent(&self, text: &str, context: &str) -> Result<String> {
        let start = Instant::now();
        let handles: Vec<_> = self
            .subnets
            .iter()
            .map(|subnet| {
                let subnet = Arc::clone(subnet);
                let text = text.to_string();
                let context = context.to_string();
                tokio::task::spawn_blocking(move || subnet.process(&text, &context))
            })
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        let mut failure = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(output)) => outputs.push(output),
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                },
                Err(e) => {
                    failure.get_or_insert(Error::failed("join_subnet_task", e));
                },
            }
        }

        let result = match failure {
            Some(e) => Err(e),
            None => self.fuse(text, outputs),
        };
        record_translate("concurrent", start, result.is_ok());
        result
    }

    fn fuse(&self, text: &str, outputs: Vec<SubnetOutput>) -> Result<String> {
        let input = self.source.embed(text)?;
        let (candidates, features): (Vec<String>, Vec<Vec<f32>>) = outputs
            .into_iter()
            .map(|output| (output.candidate, output.features))
            .unzip();
        self.fuser.fuse(&candidates, &features, &input)
    }

    /// Delivers `samples` to every subnet's memory log.
    ///
    /// Every subnet is attempted; a failing one does not roll back the
    /// others.
    ///
    /// # Errors
    ///
    /// Returns the first failure after all subnets were attempted.
    pub fn update_memory(&self, samples: &[MemorySample]) -> Result<()> {
        let mut first_error = None;
        for (index, subnet) in self.subnets.iter().enumerate() {
            if let Err(e) = subnet.update_memory(samples) {
                tracing::warn!(
                    subnet = subnet.name(),
                    index,
                    error = %e,
                    "Memory update failed"
                );
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Returns the `n` most recent samples of the subnet at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `index` is out of range.
    pub fn recent_memory(&self, index: usize, n: usize) -> Result<Vec<MemorySample>> {
        self.subnets
            .get(index)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "subnet index {index} out of range (pipeline has {})",
                    self.subnets.len()
                ))
            })?
            .recent_memory(n)
    }

    /// Propagates `mode` to every component.
    pub fn set_mode(&mut self, mode: Mode) {
        self.source.set_mode(mode);
        self.target.set_mode(mode);
        for subnet in &self.subnets {
            subnet.set_mode(mode);
        }
        self.fuser.set_mode(mode);
        self.mode = mode;
        tracing::debug!(mode = %mode, "Pipeline mode changed");
    }

    /// Current execution mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Captures the learned state of every component.
    ///
    /// # Errors
    ///
    /// Returns an error if any component cannot serialize its state.
    pub fn checkpoint(&self) -> Result<Checkpoint> {
        Ok(Checkpoint {
            source_adapter: self.source.state()?,
            target_adapter: self.target.state()?,
            subnets: self
                .subnets
                .iter()
                .map(|subnet| subnet.state())
                .collect::<Result<_>>()?,
            coordinator: self.fuser.state()?,
        })
    }

    /// Restores the learned state of every component.
    ///
    /// Every blob is checked before the fuser is modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateMismatch`] if the checkpoint holds a different
    /// number of subnet states, or the first component's rejection.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if checkpoint.subnets.len() != self.subnets.len() {
            return Err(Error::StateMismatch {
                expected: self.subnets.len(),
                found: checkpoint.subnets.len(),
            });
        }
        self.source.load_state(&checkpoint.source_adapter)?;
        self.target.load_state(&checkpoint.target_adapter)?;
        for (subnet, state) in self.subnets.iter().zip(&checkpoint.subnets) {
            subnet.load_state(state)?;
        }
        self.fuser.load_state(&checkpoint.coordinator)
    }

    /// Saves a checkpoint to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if state capture or I/O fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.checkpoint()?.write(path)
    }

    /// Loads a checkpoint from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateMismatch`] on a subnet count mismatch, or an
    /// error if the file cannot be read or a component rejects its state.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let checkpoint = Checkpoint::read(path)?;
        self.restore(&checkpoint)?;
        tracing::info!(path = %path.display(), "Loaded checkpoint");
        Ok(())
    }

    /// Domain this pipeline serves.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Number of subnets.
    #[must_use]
    pub fn subnet_count(&self) -> usize {
        self.subnets.len()
    }

    /// Subnet names in pipeline order.
    #[must_use]
    pub fn subnet_names(&self) -> Vec<&str> {
        self.subnets.iter().map(|subnet| subnet.name()).collect()
    }

    /// Memory log locations in pipeline order.
    #[must_use]
    pub fn memory_paths(&self) -> Vec<Option<PathBuf>> {
        self.subnets.iter().map(|subnet| subnet.memory_path()).collect()
    }

    /// Source adapter.
    #[must_use]
    pub fn source_adapter(&self) -> &dyn Adapter {
        self.source.as_ref()
    }

    /// Target adapter.
    #[must_use]
    pub fn target_adapter(&self) -> &dyn Adapter {
        self.target.as_ref()
    }

    /// Fuser.
    #[must_use]
    pub fn fuser(&self) -> &dyn Fuser {
        self.fuser.as_ref()
    }
}

fn record_translate(mode: &'static str, start: Instant, success: bool) {
    let status = if success { "success" } else { "error" };
    metrics::counter!(names::TRANSLATE_TOTAL, "mode" => mode, "status" => status).increment(1);
    metrics::histogram!(names::TRANSLATE_DURATION_MS, "mode" => mode)
        .record(start.elapsed().as_secs_f64() * 1000.0);
}
