//! Declarative description of the pipeline a command runs
//!
//! A plan is built once from the command line and configuration, then turned
//! into a fresh [`MetadataPipeline`] for every input of a directory scan.

use fitsmeta_core::sinks::{
    CursorFactory, CsvSink, DatabaseSink, JsonSink, OutputTarget, RemoteAnnotator, SqlMode,
    SqlScriptSink,
};
use fitsmeta_core::stages::{
    AliasTable, CatalogAliasStage, CatalogDataSource, CatalogHeaderSource, FieldsInfoStage,
    ImageAliasStage, ImageHeaderSource, MissingFieldReporter, ObsCoreCalculator,
    RemoteHeaderSource, ReportFormat,
};
use fitsmeta_core::{
    CatalogAliasSets, DbConfig, FieldsInfo, LinearTanSolver, MetadataPipeline,
    MetadataPipelineBuilder, ObjectStore, ObsCoreConfig, Result, Stage, TableName,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the first stage reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    ImageHeaders,
    CatalogHeaders,
    CatalogData,
}

/// A transform stage between source and sink
#[derive(Debug, Clone)]
pub enum StageSpec {
    ImageAliases(AliasTable),
    CatalogAliases(AliasTable),
    FieldsInfo(FieldsInfo),
    ObsCore(ObsCoreConfig),
    MissReport {
        format: ReportFormat,
        report_file: Option<PathBuf>,
    },
}

/// The terminal stage
#[derive(Debug, Clone)]
pub enum SinkSpec {
    Json {
        calculated_only: bool,
    },
    Csv,
    SqlScript {
        mode: SqlMode,
        table: TableName,
        db_user: String,
        alias_sets: CatalogAliasSets,
    },
    Database {
        mode: SqlMode,
        config: DbConfig,
        table: TableName,
        alias_sets: CatalogAliasSets,
        sql_only: bool,
    },
    Annotate {
        store: Arc<dyn ObjectStore>,
        output_only: bool,
    },
}

impl SinkSpec {
    /// Extension of the text the sink writes, `None` when it writes none
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Json { .. } => Some("json"),
            Self::Csv => Some("csv"),
            Self::SqlScript { .. } => Some("sql"),
            Self::Database { sql_only, .. } => sql_only.then_some("sql"),
            Self::Annotate { output_only, .. } => output_only.then_some("json"),
        }
    }
}

/// One input of a run, as the source stage sees it
#[derive(Debug, Clone, Copy)]
pub enum InputItem<'a> {
    Local(&'a Path),
    Remote(&'a str),
    Bundle,
}

#[derive(Debug, Clone)]
pub struct PipelinePlan {
    /// Stage label used in generated output names
    pub label: String,
    pub source: Option<SourceKind>,
    /// HDU index the source reads
    pub hdu: usize,
    /// Store used by remote sources
    pub store: Option<Arc<dyn ObjectStore>>,
    pub stages: Vec<StageSpec>,
    pub sink: SinkSpec,
}

impl PipelinePlan {
    pub fn new(label: &str, sink: SinkSpec) -> Self {
        Self {
            label: label.replace('-', "_"),
            source: None,
            hdu: 0,
            store: None,
            stages: Vec::new(),
            sink,
        }
    }

    pub fn with_source(mut self, kind: SourceKind, hdu: usize) -> Self {
        self.source = Some(kind);
        self.hdu = hdu;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_stage(mut self, stage: StageSpec) -> Self {
        self.stages.push(stage);
        self
    }

    /// True when the pipeline starts from a bundle rather than a FITS file
    pub fn needs_bundle(&self) -> bool {
        self.source.is_none()
    }

    /// Assemble the pipeline for one input
    pub fn build(
        &self,
        item: InputItem<'_>,
        target: OutputTarget,
        cursor_factory: &dyn Fn() -> Box<dyn CursorFactory>,
    ) -> Result<MetadataPipeline> {
        let mut builder = MetadataPipelineBuilder::new();
        if let Some(source) = self.source_stage(item)? {
            builder = builder.add_stage(source);
        }
        for spec in &self.stages {
            builder = builder.add_stage(stage(spec)?);
        }
        let sink: Box<dyn fitsmeta_core::Sink> = match &self.sink {
            SinkSpec::Json { calculated_only } => {
                Box::new(JsonSink::new(target).calculated_only(*calculated_only))
            }
            SinkSpec::Csv => Box::new(CsvSink::new(target)),
            SinkSpec::SqlScript {
                mode,
                table,
                db_user,
                alias_sets,
            } => Box::new(
                SqlScriptSink::new(*mode, table.clone(), db_user.clone(), target)
                    .with_alias_sets(alias_sets.clone()),
            ),
            SinkSpec::Database {
                mode,
                config,
                table,
                alias_sets,
                sql_only,
            } => {
                let mut sink =
                    DatabaseSink::new(*mode, config.clone(), table.clone(), cursor_factory())
                        .with_alias_sets(alias_sets.clone());
                if *sql_only {
                    sink = sink.sql_only(target);
                }
                Box::new(sink)
            }
            SinkSpec::Annotate { store, output_only } => {
                let mut sink = RemoteAnnotator::new(Arc::clone(store));
                if *output_only {
                    sink = sink.output_only(target);
                }
                Box::new(sink)
            }
        };
        Ok(builder.with_sink(sink).build())
    }

    fn source_stage(&self, item: InputItem<'_>) -> Result<Option<Box<dyn Stage>>> {
        let Some(kind) = self.source else {
            return Ok(None);
        };
        let stage: Box<dyn Stage> = match (item, kind) {
            (InputItem::Local(path), SourceKind::ImageHeaders) => {
                Box::new(ImageHeaderSource::new(path, self.hdu))
            }
            (InputItem::Local(path), SourceKind::CatalogHeaders) => {
                Box::new(CatalogHeaderSource::new(path, self.hdu))
            }
            (InputItem::Local(path), SourceKind::CatalogData) => {
                Box::new(CatalogDataSource::new(path, self.hdu))
            }
            (InputItem::Remote(path), kind) => {
                let store = self.store.clone().ok_or_else(|| {
                    fitsmeta_core::error::ValidationError::invalid_configuration(
                        "remote input needs an object store root",
                    )
                })?;
                match kind {
                    SourceKind::ImageHeaders => {
                        Box::new(RemoteHeaderSource::image(store, path, self.hdu))
                    }
                    SourceKind::CatalogHeaders => {
                        Box::new(RemoteHeaderSource::catalog(store, path, self.hdu))
                    }
                    SourceKind::CatalogData => {
                        return Err(fitsmeta_core::error::ValidationError::invalid_configuration(
                            "catalog data cannot be read from the object store",
                        )
                        .into());
                    }
                }
            }
            (InputItem::Bundle, _) => return Ok(None),
        };
        Ok(Some(stage))
    }
}

fn stage(spec: &StageSpec) -> Result<Box<dyn Stage>> {
    Ok(match spec {
        StageSpec::ImageAliases(aliases) => Box::new(ImageAliasStage::new(aliases.clone())),
        StageSpec::CatalogAliases(aliases) => Box::new(CatalogAliasStage::new(aliases.clone())),
        StageSpec::FieldsInfo(info) => Box::new(FieldsInfoStage::new(info.clone())?),
        StageSpec::ObsCore(config) => Box::new(ObsCoreCalculator::new(
            config.clone(),
            Box::new(LinearTanSolver),
        )),
        StageSpec::MissReport {
            format,
            report_file,
        } => {
            let mut reporter = MissingFieldReporter::new(*format);
            if let Some(path) = report_file {
                reporter = reporter.with_report_file(path);
            }
            Box::new(reporter)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitsmeta_core::sinks::PgCursorFactory;

    fn pg() -> Box<dyn CursorFactory> {
        Box::new(PgCursorFactory)
    }

    #[test]
    fn test_label_uses_underscores() {
        let plan = PipelinePlan::new("obscore-calc", SinkSpec::Json {
            calculated_only: false,
        });
        assert_eq!(plan.label, "obscore_calc");
        assert!(plan.needs_bundle());
    }

    #[test]
    fn test_build_orders_source_stages_and_sink() {
        let aliases = AliasTable::parse("[aliases]\nFILTER = filter\n").unwrap();
        let plan = PipelinePlan::new("ingest", SinkSpec::Csv)
            .with_source(SourceKind::ImageHeaders, 0)
            .with_stage(StageSpec::ImageAliases(aliases))
            .with_stage(StageSpec::ObsCore(ObsCoreConfig::default()));

        let pipeline = plan
            .build(InputItem::Local(Path::new("a.fits")), OutputTarget::Stdout, &pg)
            .unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["image_headers", "aliases", "obscore_calc", "csv_out"]
        );
        assert!(!pipeline.needs_input());

        let from_bundle = plan.build(InputItem::Bundle, OutputTarget::Stdout, &pg).unwrap();
        assert!(from_bundle.needs_input());
    }

    #[test]
    fn test_remote_source_needs_a_store() {
        let plan = PipelinePlan::new("remote-headers", SinkSpec::Json {
            calculated_only: false,
        })
        .with_source(SourceKind::ImageHeaders, 0);
        let err = plan
            .build(InputItem::Remote("/zone/a.fits"), OutputTarget::Stdout, &pg)
            .unwrap_err();
        assert_eq!(err.kind(), fitsmeta_core::ErrorKind::BadValue);
    }

    #[test]
    fn test_sink_extensions() {
        assert_eq!(SinkSpec::Csv.extension(), Some("csv"));
        assert_eq!(
            SinkSpec::Json {
                calculated_only: true
            }
            .extension(),
            Some("json")
        );
        let store: Arc<dyn ObjectStore> =
            Arc::new(fitsmeta_core::DirectoryObjectStore::new("/archive"));
        assert_eq!(
            SinkSpec::Annotate {
                store,
                output_only: false
            }
            .extension(),
            None
        );
    }
}
