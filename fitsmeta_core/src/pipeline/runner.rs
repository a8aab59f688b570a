//! Pipeline runner that applies stages in order and always cleans up

use super::{PipelineStats, Sink, Stage};
use crate::bundle::MetadataBundle;
use crate::error::{Result, ValidationError};
use log::{debug, warn};
use std::time::Instant;

/// Ordered stages plus an optional terminal sink
#[derive(Debug)]
pub struct MetadataPipeline {
    stages: Vec<Box<dyn Stage>>,
    sink: Option<Box<dyn Sink>>,
    stats: PipelineStats,
}

impl MetadataPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            sink: None,
            stats: PipelineStats::default(),
        }
    }

    /// True when the first stage expects a bundle read from elsewhere
    pub fn needs_input(&self) -> bool {
        match self.stages.first() {
            Some(stage) => !stage.is_source(),
            None => true,
        }
    }

    /// Run every stage, then the sink, on `bundle`
    ///
    /// `cleanup` runs on all stages and the sink whatever the outcome. A
    /// processing error takes precedence over a cleanup error.
    pub fn run(&mut self, bundle: MetadataBundle) -> Result<MetadataBundle> {
        let start_time = Instant::now();
        self.stats = PipelineStats::default();

        let outcome = self.run_stages(bundle);
        let cleanup = self.cleanup_all();
        self.stats.total_duration = start_time.elapsed();

        let bundle = outcome?;
        cleanup?;
        Ok(bundle)
    }

    fn run_stages(&mut self, mut bundle: MetadataBundle) -> Result<MetadataBundle> {
        for stage in self.stages.iter_mut() {
            bundle = apply(stage.as_mut(), bundle)?;
            self.stats.stages_run += 1;
        }

        if let Some(sink) = self.sink.as_mut() {
            bundle = apply(sink.as_mut(), bundle)?;
            sink.output_results(&bundle).inspect_err(|e| {
                warn!("Sink '{}' failed to deliver output: {e}", sink.name());
            })?;
            self.stats.sink_completed = true;
        }

        Ok(bundle)
    }

    fn cleanup_all(&mut self) -> Result<()> {
        let mut first_error = None;
        let stages = self.stages.iter_mut().map(|s| s.as_mut() as &mut dyn Stage);
        let sink = self.sink.iter_mut().map(|s| s.as_mut() as &mut dyn Stage);

        for stage in stages.chain(sink) {
            if let Err(e) = stage.cleanup() {
                warn!("Cleanup of stage '{}' failed: {e}", stage.name());
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Get current statistics
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Names of the stages, sink last
    pub fn stage_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        if let Some(sink) = &self.sink {
            names.push(sink.name());
        }
        names
    }

    /// Get the number of stages, not counting the sink
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl Default for MetadataPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one stage and check that it kept every incoming section
fn apply(stage: &mut dyn Stage, bundle: MetadataBundle) -> Result<MetadataBundle> {
    let before = bundle.sections();
    debug!("Running stage '{}' on sections {:?}", stage.name(), before);

    let bundle = stage.process(bundle).inspect_err(|e| {
        debug!("Stage '{}' failed with {}: {e}", stage.name(), e.kind());
    })?;

    let after = bundle.sections();
    if let Some(missing) = before.iter().find(|s| !after.contains(s)) {
        return Err(ValidationError::section_removed(stage.name(), missing).into());
    }
    Ok(bundle)
}

/// Builder for MetadataPipeline
#[derive(Debug, Default)]
pub struct MetadataPipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
    sink: Option<Box<dyn Sink>>,
}

impl MetadataPipelineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage to the pipeline
    pub fn add_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Terminate the pipeline with a sink
    pub fn with_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> MetadataPipeline {
        MetadataPipeline {
            stages: self.stages,
            sink: self.sink,
            stats: PipelineStats::default(),
        }
    }
}
