//! Both sub-engines behind one handle.

use crate::backend::{InputBackend, SystemBackend};
use crate::build::BuildAggregator;
use crate::config::{BuildConfig, TriggerConfig};
use crate::error::Result;
use crate::gate::EnableGate;
use crate::hook::{KeyHook, SystemHook};
use crate::sequence::SequenceEngine;
use crate::status::StatusSink;
use std::sync::Arc;

/// Sequence engine and build aggregator sharing one backend, sink and gate.
///
/// Dropping the engine stops both and releases every key they hold.
pub struct Engine {
    sequence: SequenceEngine,
    build: BuildAggregator,
}

impl Engine {
    pub fn new(
        backend: Arc<dyn InputBackend>,
        hook: Arc<dyn KeyHook>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            sequence: SequenceEngine::new(backend.clone(), hook, sink.clone()),
            build: BuildAggregator::new(backend, sink),
        }
    }

    /// Engine on the platform's native input and hook.
    pub fn system(sink: impl StatusSink + 'static) -> Self {
        Self::new(Arc::new(SystemBackend), Arc::new(SystemHook), Arc::new(sink))
    }

    pub fn with_gate(self, gate: Arc<dyn EnableGate>) -> Self {
        Self {
            sequence: self.sequence.with_gate(gate.clone()),
            build: self.build.with_gate(gate),
        }
    }

    pub fn sequence(&self) -> &SequenceEngine {
        &self.sequence
    }

    pub fn build(&self) -> &BuildAggregator {
        &self.build
    }

    /// Start the sequence engine without blocking.
    pub fn start_sequence(&self, config: TriggerConfig) -> Result<()> {
        self.sequence.start_background(config)
    }

    pub fn start_build(&self, config: BuildConfig) -> Result<()> {
        self.build.start(config)
    }

    /// Stop the sequence engine and start it again with `config`.
    pub fn reconfigure_sequence(&self, config: TriggerConfig) -> Result<()> {
        self.sequence.stop()?;
        self.sequence.start_background(config)
    }

    /// Stop the aggregator and start it again with `config`.
    pub fn reconfigure_build(&self, config: BuildConfig) -> Result<()> {
        self.build.stop()?;
        self.build.start(config)
    }

    /// Stop both sub-engines. Both are stopped even if the first fails.
    pub fn stop_all(&self) -> Result<()> {
        let sequence = self.sequence.stop();
        let build = self.build.stop();
        sequence.and(build)
    }

    pub fn is_running(&self) -> bool {
        self.sequence.is_running() || self.build.is_running()
    }
}
