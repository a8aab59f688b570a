use clap::{Args, Parser, Subcommand};
use colored::*;
use fitsmeta_cli::config::{AppConfig, ConfigManager};
use fitsmeta_cli::error::{CliError, CliResult, ErrorContext, ExitCode};
use fitsmeta_cli::file_discovery::ScanOptions;
use fitsmeta_cli::orchestrators::{
    InputSpec, OutputChoice, PipelineOrchestrator, PipelinePlan, SinkSpec, SourceKind, StageSpec,
};
use fitsmeta_cli::terminal;
use fitsmeta_core::sinks::SqlMode;
use fitsmeta_core::stages::{AliasTable, ReportFormat, load_fields_info};
use fitsmeta_core::{DbConfig, DirectoryObjectStore, ObjectStore, TableName};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fitsmeta")]
#[command(author, version, about = "FITS metadata extraction and ObsCore ingestion", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log progress at info level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: $XDG_CONFIG_HOME/fitsmeta/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Write output to this file instead of stdout
    #[arg(short = 'o', long, value_name = "PATH", conflicts_with = "generate")]
    output_file: Option<PathBuf>,

    /// Write output to an auto-named file in the output directory
    #[arg(short = 'g', long)]
    generate: bool,

    /// Output directory for --generate (default: output.out_dir)
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Read the metadata bundle from this JSON file instead of stdin
    #[arg(short = 'i', long, value_name = "PATH")]
    input_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
struct LocalSourceArgs {
    /// FITS file to read
    #[arg(short = 'f', long, value_name = "PATH")]
    fits_file: Option<PathBuf>,

    /// Directory whose FITS files are processed one after another
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// FITS file to read
    #[arg(short = 'f', long, value_name = "PATH")]
    fits_file: Option<PathBuf>,

    /// Directory whose FITS files are processed one after another
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,

    /// Path of a FITS object in the object store
    #[arg(long = "irods-fits-file", value_name = "REMOTE_PATH")]
    irods_fits_file: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// Descend into subdirectories of --input-dir
    #[arg(short, long)]
    recursive: bool,

    /// Exclude patterns (glob patterns, can be specified multiple times)
    #[arg(short = 'e', long = "exclude", value_name = "PATTERN")]
    exclude_patterns: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct StoreArgs {
    /// Root directory of the object store (default: store.root)
    #[arg(long, value_name = "DIR")]
    store_root: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct DbArgs {
    /// Database configuration file (default: resources.db_config_file)
    #[arg(long, value_name = "PATH")]
    db_config: Option<PathBuf>,

    /// Target table as schema.table (default: from the database configuration)
    #[arg(long, value_name = "SCHEMA.TABLE")]
    table_name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the header of an image HDU into a new bundle
    ImageHeaders {
        #[command(flatten)]
        source: LocalSourceArgs,
        #[command(flatten)]
        scan: ScanArgs,
        /// Image HDU index
        #[arg(long, default_value_t = 0)]
        hdu: usize,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Read the header and column layout of a table HDU
    CatalogHeaders {
        #[command(flatten)]
        source: LocalSourceArgs,
        #[command(flatten)]
        scan: ScanArgs,
        /// Table HDU index
        #[arg(long, default_value_t = 1)]
        catalog_hdu: usize,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Read the header, column layout and rows of a table HDU
    CatalogData {
        #[command(flatten)]
        source: LocalSourceArgs,
        #[command(flatten)]
        scan: ScanArgs,
        /// Table HDU index
        #[arg(long, default_value_t = 1)]
        catalog_hdu: usize,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Read an HDU header from the object store
    RemoteHeaders {
        /// Path of the FITS object in the store
        #[arg(long = "irods-fits-file", value_name = "REMOTE_PATH")]
        irods_fits_file: String,
        #[command(flatten)]
        store: StoreArgs,
        /// Image HDU index
        #[arg(long, default_value_t = 0, conflicts_with = "catalog_hdu")]
        hdu: usize,
        /// Read a table HDU at this index instead of an image
        #[arg(long)]
        catalog_hdu: Option<usize>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rename header keywords through an aliases file
    Aliases {
        /// Aliases file (default: resources.aliases_file)
        #[arg(short = 'a', long, value_name = "PATH")]
        aliases: Option<PathBuf>,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rename table columns through an aliases file
    CatalogAliases {
        /// Aliases file (default: resources.catalog_aliases_file)
        #[arg(short = 'a', long, value_name = "PATH")]
        aliases: Option<PathBuf>,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Attach field descriptions and defaults
    FieldsInfo {
        /// Fields-info file (default: resources.fields_info_file)
        #[arg(long, value_name = "PATH")]
        fields_info: Option<PathBuf>,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Calculate ObsCore values
    ObscoreCalc {
        /// Value of obs_collection (default: obscore.collection)
        #[arg(long)]
        collection: Option<String>,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Report described fields missing from the calculated values
    MissReport {
        /// Report layout (default: output.report_format)
        #[arg(long, value_enum)]
        format: Option<ReportFormatArg>,
        /// Also write the report to this file
        #[arg(long, value_name = "PATH")]
        report_file: Option<PathBuf>,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write the bundle as JSON
    JsonOut {
        /// Write only the calculated values
        #[arg(long)]
        calculated_only: bool,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write the calculated values as a CSV row
    CsvOut {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write INSERT statements as a SQL script
    SqlInsert {
        /// What to insert
        #[arg(long, value_enum, default_value = "obscore")]
        mode: InsertModeArg,
        #[command(flatten)]
        db: DbArgs,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write CREATE TABLE statements for a catalog as a SQL script
    SqlCreateTable {
        #[command(flatten)]
        db: DbArgs,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Insert the bundle into the database
    DbRow {
        /// What to do with the bundle
        #[arg(long, value_enum, default_value = "obscore")]
        mode: DbModeArg,
        #[command(flatten)]
        db: DbArgs,
        /// Write the statements instead of executing them
        #[arg(long)]
        sql_only: bool,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Attach the calculated values to the object as store metadata
    RemoteAnnotate {
        #[command(flatten)]
        store: StoreArgs,
        /// Write the metadata entries instead of attaching them
        #[arg(long)]
        output_only: bool,
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run the whole image chain: headers, aliases, fields, ObsCore, report, sink
    Ingest {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        scan: ScanArgs,
        #[command(flatten)]
        store: StoreArgs,
        /// Image HDU index
        #[arg(long, default_value_t = 0)]
        hdu: usize,
        /// Aliases file (default: resources.aliases_file)
        #[arg(short = 'a', long, value_name = "PATH")]
        aliases: Option<PathBuf>,
        /// Fields-info file (default: resources.fields_info_file)
        #[arg(long, value_name = "PATH")]
        fields_info: Option<PathBuf>,
        /// Value of obs_collection (default: obscore.collection)
        #[arg(long)]
        collection: Option<String>,
        /// Also write the missing-field report to this file
        #[arg(long, value_name = "PATH")]
        report_file: Option<PathBuf>,
        /// Where the result goes
        #[arg(long, value_enum, default_value = "json")]
        sink: IngestSinkArg,
        #[command(flatten)]
        db: DbArgs,
        /// With --sink db: write the statements instead of executing them
        #[arg(long)]
        sql_only: bool,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the effective configuration
    Config,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ReportFormatArg {
    Text,
    Json,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum InsertModeArg {
    /// A row of the ObsCore table
    Obscore,
    /// A row of the hybrid table
    Hybrid,
    /// Every row of a catalog table
    Catalog,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DbModeArg {
    Obscore,
    Hybrid,
    CreateTable,
    FillCatalog,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum IngestSinkArg {
    Json,
    Csv,
    Sql,
    Db,
    Annotate,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(arg: ReportFormatArg) -> Self {
        match arg {
            ReportFormatArg::Text => ReportFormat::Text,
            ReportFormatArg::Json => ReportFormat::Json,
        }
    }
}

impl From<InsertModeArg> for SqlMode {
    fn from(arg: InsertModeArg) -> Self {
        match arg {
            InsertModeArg::Obscore => SqlMode::ObsCoreRow,
            InsertModeArg::Hybrid => SqlMode::HybridRow,
            InsertModeArg::Catalog => SqlMode::FillCatalog,
        }
    }
}

impl From<DbModeArg> for SqlMode {
    fn from(arg: DbModeArg) -> Self {
        match arg {
            DbModeArg::Obscore => SqlMode::ObsCoreRow,
            DbModeArg::Hybrid => SqlMode::HybridRow,
            DbModeArg::CreateTable => SqlMode::CreateTable,
            DbModeArg::FillCatalog => SqlMode::FillCatalog,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Warn)
            .filter_module("fitsmeta_core", log::LevelFilter::Debug)
            .filter_module("fitsmeta_cli", log::LevelFilter::Debug)
            .filter_module("fitsmeta", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }
    terminal::configure_color();

    let code = match run(cli.command, cli.config) {
        Ok(code) => code,
        Err(e) => {
            eprint!("{}", e.format_for_user(cli.debug));
            e.exit_code()
        }
    };
    std::process::exit(code.code());
}

fn run(command: Commands, config_path: Option<PathBuf>) -> CliResult<ExitCode> {
    let manager = match config_path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    if let Commands::Config = command {
        show_config(&manager)?;
        return Ok(ExitCode::Success);
    }

    let config = manager.load()?;
    let (plan, input, output) = plan_command(command, &config)?;
    log::debug!("Running {} on {input:?}", plan.label);

    let summary = PipelineOrchestrator::new().run(&plan, &input, &output)?;
    if summary.skipped + summary.failed > 0 {
        log::info!(
            "{} processed, {} skipped, {} failed",
            summary.processed,
            summary.skipped,
            summary.failed
        );
    }
    Ok(summary.exit_code())
}

/// Translate a subcommand into the plan, input and output it runs with
fn plan_command(
    command: Commands,
    config: &AppConfig,
) -> CliResult<(PipelinePlan, InputSpec, OutputChoice)> {
    let json = SinkSpec::Json {
        calculated_only: false,
    };
    let planned = match command {
        Commands::ImageHeaders {
            source,
            scan,
            hdu,
            output,
        } => (
            PipelinePlan::new("image-headers", json).with_source(SourceKind::ImageHeaders, hdu),
            local_input(source, scan),
            output,
        ),
        Commands::CatalogHeaders {
            source,
            scan,
            catalog_hdu,
            output,
        } => (
            PipelinePlan::new("catalog-headers", json)
                .with_source(SourceKind::CatalogHeaders, catalog_hdu),
            local_input(source, scan),
            output,
        ),
        Commands::CatalogData {
            source,
            scan,
            catalog_hdu,
            output,
        } => (
            PipelinePlan::new("catalog-data", json)
                .with_source(SourceKind::CatalogData, catalog_hdu),
            local_input(source, scan),
            output,
        ),
        Commands::RemoteHeaders {
            irods_fits_file,
            store,
            hdu,
            catalog_hdu,
            output,
        } => {
            let plan = match catalog_hdu {
                Some(index) => PipelinePlan::new("remote-headers", json)
                    .with_source(SourceKind::CatalogHeaders, index),
                None => PipelinePlan::new("remote-headers", json)
                    .with_source(SourceKind::ImageHeaders, hdu),
            };
            (
                plan.with_store(object_store(store, config)?),
                InputSpec::Remote(irods_fits_file),
                output,
            )
        }
        Commands::Aliases {
            aliases,
            input,
            output,
        } => {
            let path = resource(aliases, &config.resources.aliases_file, "--aliases", "aliases_file")?;
            (
                PipelinePlan::new("aliases", json)
                    .with_stage(StageSpec::ImageAliases(load_aliases(&path)?)),
                bundle_input(input),
                output,
            )
        }
        Commands::CatalogAliases {
            aliases,
            input,
            output,
        } => {
            let path = resource(
                aliases,
                &config.resources.catalog_aliases_file,
                "--aliases",
                "catalog_aliases_file",
            )?;
            (
                PipelinePlan::new("catalog-aliases", json)
                    .with_stage(StageSpec::CatalogAliases(load_aliases(&path)?)),
                bundle_input(input),
                output,
            )
        }
        Commands::FieldsInfo {
            fields_info,
            input,
            output,
        } => (
            PipelinePlan::new("fields-info", json).with_stage(fields_stage(fields_info, config)?),
            bundle_input(input),
            output,
        ),
        Commands::ObscoreCalc {
            collection,
            input,
            output,
        } => (
            PipelinePlan::new("obscore-calc", json).with_stage(obscore_stage(collection, config)),
            bundle_input(input),
            output,
        ),
        Commands::MissReport {
            format,
            report_file,
            input,
            output,
        } => (
            PipelinePlan::new("miss-report", json).with_stage(StageSpec::MissReport {
                format: format.map_or(config.output.report_format, ReportFormat::from),
                report_file,
            }),
            bundle_input(input),
            output,
        ),
        Commands::JsonOut {
            calculated_only,
            input,
            output,
        } => (
            PipelinePlan::new("json-out", SinkSpec::Json { calculated_only }),
            bundle_input(input),
            output,
        ),
        Commands::CsvOut { input, output } => (
            PipelinePlan::new("csv-out", SinkSpec::Csv),
            bundle_input(input),
            output,
        ),
        Commands::SqlInsert {
            mode,
            db,
            input,
            output,
        } => (
            PipelinePlan::new("sql-insert", sql_script_sink(mode.into(), db, config)?),
            bundle_input(input),
            output,
        ),
        Commands::SqlCreateTable { db, input, output } => (
            PipelinePlan::new(
                "sql-create-table",
                sql_script_sink(SqlMode::CreateTable, db, config)?,
            ),
            bundle_input(input),
            output,
        ),
        Commands::DbRow {
            mode,
            db,
            sql_only,
            input,
            output,
        } => (
            PipelinePlan::new("db-row", database_sink(mode.into(), db, sql_only, config)?),
            bundle_input(input),
            output,
        ),
        Commands::RemoteAnnotate {
            store,
            output_only,
            input,
            output,
        } => (
            PipelinePlan::new("remote-annotate", SinkSpec::Annotate {
                store: object_store(store, config)?,
                output_only,
            }),
            bundle_input(input),
            output,
        ),
        Commands::Ingest {
            source,
            scan,
            store,
            hdu,
            aliases,
            fields_info,
            collection,
            report_file,
            sink,
            db,
            sql_only,
            output,
        } => {
            let remote = source.irods_fits_file.is_some() || matches!(sink, IngestSinkArg::Annotate);
            let store = if remote {
                Some(object_store(store, config)?)
            } else {
                None
            };
            let sink = match sink {
                IngestSinkArg::Json => SinkSpec::Json {
                    calculated_only: true,
                },
                IngestSinkArg::Csv => SinkSpec::Csv,
                IngestSinkArg::Sql => sql_script_sink(SqlMode::ObsCoreRow, db, config)?,
                IngestSinkArg::Db => database_sink(SqlMode::ObsCoreRow, db, sql_only, config)?,
                IngestSinkArg::Annotate => SinkSpec::Annotate {
                    store: store.clone().ok_or_else(|| CliError::misuse("No --store-root given"))?,
                    output_only: false,
                },
            };

            let aliases_path =
                resource(aliases, &config.resources.aliases_file, "--aliases", "aliases_file")?;
            let mut plan = PipelinePlan::new("ingest", sink)
                .with_source(SourceKind::ImageHeaders, hdu)
                .with_stage(StageSpec::ImageAliases(load_aliases(&aliases_path)?))
                .with_stage(fields_stage(fields_info, config)?)
                .with_stage(obscore_stage(collection, config))
                .with_stage(StageSpec::MissReport {
                    format: config.output.report_format,
                    report_file,
                });
            if let Some(store) = store {
                plan = plan.with_store(store);
            }

            let input = match source.irods_fits_file {
                Some(remote_path) => InputSpec::Remote(remote_path),
                None => local_input(
                    LocalSourceArgs {
                        fits_file: source.fits_file,
                        input_dir: source.input_dir,
                    },
                    scan,
                ),
            };
            (plan, input, output)
        }
        Commands::Config => return Err(CliError::misuse("config takes no pipeline")),
    };

    let (plan, input, output) = planned;
    Ok((plan, input, output_choice(output, config)))
}

fn local_input(source: LocalSourceArgs, scan: ScanArgs) -> InputSpec {
    match (source.fits_file, source.input_dir) {
        (Some(path), _) => InputSpec::File(path),
        (None, Some(path)) => InputSpec::Directory {
            path,
            options: ScanOptions::new()
                .recursive(scan.recursive)
                .exclude(scan.exclude_patterns),
        },
        // clap's argument group requires one of the two
        (None, None) => InputSpec::File(PathBuf::new()),
    }
}

fn bundle_input(input: InputArgs) -> InputSpec {
    InputSpec::Bundle(input.input_file)
}

fn output_choice(output: OutputArgs, config: &AppConfig) -> OutputChoice {
    match (output.output_file, output.generate) {
        (Some(path), _) => OutputChoice::File(path),
        (None, true) => {
            OutputChoice::Generate(output.out_dir.unwrap_or_else(|| config.output.out_dir.clone()))
        }
        (None, false) => OutputChoice::Stdout,
    }
}

/// A resource path from its flag, else from the configuration
fn resource(
    flag: Option<PathBuf>,
    configured: &Option<PathBuf>,
    flag_name: &str,
    config_key: &str,
) -> CliResult<PathBuf> {
    flag.or_else(|| configured.clone())
        .ok_or_else(|| CliError::missing_resource(flag_name, config_key))
}

fn load_aliases(path: &Path) -> CliResult<AliasTable> {
    AliasTable::load(path).map_err(|e| CliError::invalid_alias_file(path, e))
}

fn fields_stage(flag: Option<PathBuf>, config: &AppConfig) -> CliResult<StageSpec> {
    let path = resource(
        flag,
        &config.resources.fields_info_file,
        "--fields-info",
        "fields_info_file",
    )?;
    let info = load_fields_info(&path).map_err(|e| CliError::invalid_fields_file(&path, e))?;
    Ok(StageSpec::FieldsInfo(info))
}

fn obscore_stage(collection: Option<String>, config: &AppConfig) -> StageSpec {
    let mut obscore = config.obscore_config();
    if collection.is_some() {
        obscore.collection = collection;
    }
    StageSpec::ObsCore(obscore)
}

fn object_store(store: StoreArgs, config: &AppConfig) -> CliResult<Arc<dyn ObjectStore>> {
    let root = store
        .store_root
        .or_else(|| config.store.root.clone())
        .ok_or_else(|| {
            CliError::misuse("No --store-root given")
                .with_suggestion("Pass --store-root <dir> or set store.root in the config file")
        })?;
    if !root.is_dir() {
        return Err(CliError::invalid_input_dir(&root));
    }
    Ok(Arc::new(DirectoryObjectStore::new(root)))
}

fn load_db_config(db: &DbArgs, config: &AppConfig) -> CliResult<DbConfig> {
    let path = resource(
        db.db_config.clone(),
        &config.resources.db_config_file,
        "--db-config",
        "db_config_file",
    )?;
    DbConfig::load(&path).map_err(|e| CliError::invalid_db_config(&path, e))
}

/// The table a SQL mode writes to, from `--table-name` or the DB config
fn table_for(mode: SqlMode, db: &DbArgs, db_config: &DbConfig) -> CliResult<TableName> {
    let configured = match mode {
        SqlMode::ObsCoreRow => &db_config.db_table_name,
        SqlMode::HybridRow => &db_config.db_hybrid_table_name,
        SqlMode::CreateTable | SqlMode::FillCatalog => &db_config.db_catalog_table_name,
    };
    let text = db
        .table_name
        .as_deref()
        .or(configured.as_deref())
        .ok_or_else(|| CliError::invalid_catalog_table("No table name given or configured"))?;
    TableName::parse(text, &db_config.db_schema_name)
        .map_err(|e| CliError::invalid_catalog_table(&e.to_string()))
}

fn sql_script_sink(mode: SqlMode, db: DbArgs, config: &AppConfig) -> CliResult<SinkSpec> {
    let db_config = load_db_config(&db, config)?;
    Ok(SinkSpec::SqlScript {
        mode,
        table: table_for(mode, &db, &db_config)?,
        db_user: db_config.db_user,
        alias_sets: config.alias_sets(),
    })
}

fn database_sink(
    mode: SqlMode,
    db: DbArgs,
    sql_only: bool,
    config: &AppConfig,
) -> CliResult<SinkSpec> {
    let db_config = load_db_config(&db, config)?;
    Ok(SinkSpec::Database {
        mode,
        table: table_for(mode, &db, &db_config)?,
        config: db_config,
        alias_sets: config.alias_sets(),
        sql_only,
    })
}

fn show_config(manager: &ConfigManager) -> CliResult<()> {
    let items = manager.list()?;
    eprintln!("{}", "Configuration:".bold().blue());
    eprintln!("Config file: {}", manager.get_config_path().display());
    eprintln!();

    let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for (key, value) in items {
        let section = key.split('.').next().unwrap_or("general").to_string();
        sections.entry(section).or_default().push((key, value));
    }

    for (section, items) in sections {
        println!("[{section}]");
        for (key, value) in items {
            let display_key = key.split_once('.').map_or(key.as_str(), |(_, rest)| rest);
            println!("  {} = {}", display_key.cyan(), value);
        }
        println!();
    }
    Ok(())
}
