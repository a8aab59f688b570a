//! Stage-composition pipeline over metadata bundles
//!
//! Stages take a [`MetadataBundle`] by value and return it, adding the
//! sections they own. A pipeline is an ordered list of stages optionally
//! terminated by a [`Sink`] that delivers the finished bundle somewhere.

use crate::Result;
use crate::bundle::MetadataBundle;
use std::fmt::Debug;

mod runner;

pub use runner::{MetadataPipeline, MetadataPipelineBuilder};

/// Core trait for pipeline stages
///
/// Each stage receives the bundle produced by its predecessor and returns
/// it with its own sections added. Sections produced upstream must be kept.
pub trait Stage: Debug {
    /// Transform the bundle
    ///
    /// # Arguments
    /// * `bundle` - The bundle produced by the previous stage
    ///
    /// # Returns
    /// The bundle with this stage's sections added
    fn process(&mut self, bundle: MetadataBundle) -> Result<MetadataBundle>;

    /// Release anything the stage still holds
    ///
    /// Called after every run, including failed ones. Calling it twice is
    /// harmless.
    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Get the name of this stage for logging and output file names
    fn name(&self) -> &str;

    /// True for stages that create a bundle from an input file
    fn is_source(&self) -> bool {
        false
    }
}

/// A stage that delivers the finished bundle
pub trait Sink: Stage {
    /// Write, insert or attach the bundle's results
    fn output_results(&mut self, bundle: &MetadataBundle) -> Result<()>;
}

/// Statistics from pipeline execution
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Number of stages whose `process` returned successfully
    pub stages_run: usize,
    /// Whether the sink delivered output
    pub sink_completed: bool,
    /// Total processing time
    pub total_duration: std::time::Duration,
}
