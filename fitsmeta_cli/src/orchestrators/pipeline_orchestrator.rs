//! Runs a [`PipelinePlan`] over a file, a directory, a remote object or a
//! bundle read from JSON

use super::plan::{InputItem, PipelinePlan};
use crate::error::{CliError, CliResult, ErrorContext, ExitCode};
use crate::file_discovery::{FitsScan, ScanOptions};
use fitsmeta_core::sinks::{CursorFactory, OutputTarget, PgCursorFactory, generated_output_path};
use fitsmeta_core::{MetadataBundle, MetadataPipeline};
use log::{debug, error, info, warn};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Where the pipeline's input comes from
#[derive(Debug, Clone)]
pub enum InputSpec {
    /// A single local FITS file
    File(PathBuf),
    /// Every FITS file found below a directory
    Directory {
        path: PathBuf,
        options: ScanOptions,
    },
    /// An object in the store
    Remote(String),
    /// A JSON bundle from a file, or stdin when `None`
    Bundle(Option<PathBuf>),
}

/// Where text-writing sinks send their output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChoice {
    Stdout,
    File(PathBuf),
    /// Auto-named file below this directory
    Generate(PathBuf),
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Exit code of the last input that aborted
    pub last_abort: Option<ExitCode>,
}

impl RunSummary {
    pub fn exit_code(&self) -> ExitCode {
        self.last_abort.unwrap_or(ExitCode::Success)
    }
}

/// Drives pipelines built from a plan
pub struct PipelineOrchestrator {
    cursor_factory: Box<dyn Fn() -> Box<dyn CursorFactory>>,
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOrchestrator {
    /// Orchestrator whose database sinks connect to PostgreSQL
    pub fn new() -> Self {
        Self {
            cursor_factory: Box::new(|| Box::new(PgCursorFactory)),
        }
    }

    /// Replace the cursor factory handed to database sinks
    pub fn with_cursor_factory(
        mut self,
        factory: impl Fn() -> Box<dyn CursorFactory> + 'static,
    ) -> Self {
        self.cursor_factory = Box::new(factory);
        self
    }

    /// Run `plan` on `input`
    ///
    /// A single input fails with its own error. A directory scan warns and
    /// continues past skippable inputs, logs aborting ones and reports the
    /// last abort code in the summary.
    pub fn run(
        &self,
        plan: &PipelinePlan,
        input: &InputSpec,
        output: &OutputChoice,
    ) -> CliResult<RunSummary> {
        match input {
            InputSpec::File(path) => {
                if !path.is_file() {
                    return Err(CliError::invalid_fits_path(path));
                }
                let target = self.target(plan, path, output, 0);
                self.run_one(plan, InputItem::Local(path), target, MetadataBundle::new())?;
                Ok(RunSummary {
                    processed: 1,
                    ..RunSummary::default()
                })
            }
            InputSpec::Directory { path, options } => self.run_directory(plan, path, options, output),
            InputSpec::Remote(remote_path) => {
                let target = self.target(plan, Path::new(remote_path), output, 0);
                self.run_one(
                    plan,
                    InputItem::Remote(remote_path),
                    target,
                    MetadataBundle::new(),
                )?;
                Ok(RunSummary {
                    processed: 1,
                    ..RunSummary::default()
                })
            }
            InputSpec::Bundle(path) => {
                let bundle = read_bundle(path.as_deref())?;
                let name = path.as_deref().unwrap_or(Path::new(""));
                let target = self.target(plan, name, output, 0);
                self.run_one(plan, InputItem::Bundle, target, bundle)?;
                Ok(RunSummary {
                    processed: 1,
                    ..RunSummary::default()
                })
            }
        }
    }

    fn run_directory(
        &self,
        plan: &PipelinePlan,
        dir: &Path,
        options: &ScanOptions,
        output: &OutputChoice,
    ) -> CliResult<RunSummary> {
        if !dir.is_dir() {
            return Err(CliError::invalid_input_dir(dir));
        }
        let discovery = FitsScan::new(dir, options)
            .map_err(|e| CliError::invalid_input_dir(dir).with_context("reason", &e.to_string()))?;

        let mut summary = RunSummary::default();
        for found in discovery {
            let file = match found {
                Ok(file) => file,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {e}", dir.display());
                    continue;
                }
            };
            debug!("Processing {} ({} bytes)", file.path.display(), file.size);

            let target = self.target(plan, &file.path, output, summary.processed);
            match self.run_one(plan, InputItem::Local(&file.path), target, MetadataBundle::new()) {
                Ok(()) => summary.processed += 1,
                Err(e) if e.is_skippable() => {
                    warn!("Skipping {}: {e}", file.path.display());
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!("{}: {e}", file.path.display());
                    summary.failed += 1;
                    summary.last_abort = Some(ExitCode::for_kind(e.kind()));
                }
            }
        }

        info!(
            "Scanned {}: {} processed, {} skipped, {} failed",
            dir.display(),
            summary.processed,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    fn run_one(
        &self,
        plan: &PipelinePlan,
        item: InputItem<'_>,
        target: OutputTarget,
        bundle: MetadataBundle,
    ) -> fitsmeta_core::Result<()> {
        let mut pipeline: MetadataPipeline = plan.build(item, target, self.cursor_factory.as_ref())?;
        pipeline.run(bundle)?;
        let stats = pipeline.stats();
        debug!(
            "{} stages in {:?}, sink completed: {}",
            stats.stages_run, stats.total_duration, stats.sink_completed
        );
        Ok(())
    }

    /// Output target after `written` inputs have already produced output
    ///
    /// A fixed output file is truncated by the first result and appended to
    /// by the rest, so a directory scan collects every result in one file.
    fn target(
        &self,
        plan: &PipelinePlan,
        input: &Path,
        output: &OutputChoice,
        written: usize,
    ) -> OutputTarget {
        match output {
            OutputChoice::Stdout => OutputTarget::Stdout,
            OutputChoice::File(path) if written == 0 => OutputTarget::file(path),
            OutputChoice::File(path) => OutputTarget::append(path),
            OutputChoice::Generate(out_dir) => {
                let ext = plan.sink.extension().unwrap_or("json");
                let now = chrono::Local::now().naive_local();
                OutputTarget::file(generated_output_path(out_dir, input, &plan.label, ext, now))
            }
        }
    }
}

fn read_bundle(path: Option<&Path>) -> CliResult<MetadataBundle> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                CliError::invalid_input_file(
                    &path.display().to_string(),
                    fitsmeta_core::error::IoError::from_std(e)
                        .with_path(path)
                        .into(),
                )
            })?;
            MetadataBundle::read_json(io::BufReader::new(file))
                .map_err(|e| CliError::invalid_input_file(&path.display().to_string(), e))
        }
        None => MetadataBundle::read_json(io::stdin().lock())
            .map_err(|e| CliError::invalid_input_file("stdin", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrators::plan::{SinkSpec, SourceKind};
    use fitsmeta_test_utils::FitsBuilder;
    use tempfile::TempDir;

    fn headers_plan() -> PipelinePlan {
        PipelinePlan::new("image-headers", SinkSpec::Json {
            calculated_only: false,
        })
        .with_source(SourceKind::ImageHeaders, 0)
    }

    #[test]
    fn test_missing_fits_file_is_exit_20() {
        let dir = TempDir::new().unwrap();
        let err = PipelineOrchestrator::new()
            .run(
                &headers_plan(),
                &InputSpec::File(dir.path().join("absent.fits")),
                &OutputChoice::Stdout,
            )
            .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::InvalidFitsPath);
    }

    #[test]
    fn test_directory_scan_skips_unsupported_inputs() {
        let dir = TempDir::new().unwrap();
        FitsBuilder::image(4, 4)
            .write_to(&dir.path().join("a_image.fits"))
            .unwrap();
        FitsBuilder::primary_only()
            .bintable(&[("ID", "K")], 0)
            .write_to(&dir.path().join("b_catalog.fits"))
            .unwrap();
        std::fs::write(dir.path().join("c_truncated.fits"), b"SIMPLE").unwrap();
        let out = dir.path().join("headers.json");

        let summary = PipelineOrchestrator::new()
            .run(
                &headers_plan(),
                &InputSpec::Directory {
                    path: dir.path().to_path_buf(),
                    options: ScanOptions::new(),
                },
                &OutputChoice::File(out.clone()),
            )
            .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.exit_code(), ExitCode::Success);
        assert!(std::fs::read_to_string(out).unwrap().contains("\"headers\""));
    }

    #[test]
    fn test_not_a_directory_is_exit_21() {
        let dir = TempDir::new().unwrap();
        let err = PipelineOrchestrator::new()
            .run(
                &headers_plan(),
                &InputSpec::Directory {
                    path: dir.path().join("missing"),
                    options: ScanOptions::new(),
                },
                &OutputChoice::Stdout,
            )
            .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::InvalidInputDir);
    }

    #[test]
    fn test_invalid_bundle_is_exit_33() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bundle.json");
        std::fs::write(&input, "not json").unwrap();
        let plan = PipelinePlan::new("json-out", SinkSpec::Json {
            calculated_only: false,
        });

        let err = PipelineOrchestrator::new()
            .run(&plan, &InputSpec::Bundle(Some(input)), &OutputChoice::Stdout)
            .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::InvalidInputFile);
    }

    #[test]
    fn test_generated_output_is_named_after_input_and_label() {
        let dir = TempDir::new().unwrap();
        let fits = dir.path().join("goods_s.fits");
        FitsBuilder::image(4, 4).write_to(&fits).unwrap();
        let out_dir = dir.path().join("out");

        PipelineOrchestrator::new()
            .run(
                &headers_plan(),
                &InputSpec::File(fits),
                &OutputChoice::Generate(out_dir.clone()),
            )
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(out_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("goods_s_image_headers_"));
        assert!(names[0].ends_with(".json"));
    }
}
