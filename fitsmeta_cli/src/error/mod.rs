use colored::*;
use fitsmeta_core::ErrorKind;
use std::error::Error as StdError;
use std::fmt;
use std::path::Path;

/// Failure of a `fitsmeta` command, carrying the exit code it ends with
///
/// Besides the message it keeps `key: value` context lines and hints that
/// [`CliError::format_for_user`] prints below the message.
#[derive(Debug)]
pub struct CliError {
    message: String,
    category: ErrorCategory,
    context: Vec<(String, String)>,
    pub suggestions: Vec<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// What failed; decides the exit code and the message label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    InvalidFitsPath,
    InvalidInputDir,
    InvalidCatalogTable,
    InvalidAliasFile,
    InvalidDbConfig,
    InvalidFieldsFile,
    InvalidInputFile,
    Processing(ErrorKind),
}

/// Semantic exit codes for the CLI
///
/// 2x codes reject an input path, 3x codes reject a resource file and 4x
/// codes report a processing failure of the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    InvalidFitsPath = 20,
    InvalidInputDir = 21,
    InvalidCatalogTable = 22,
    InvalidAliasFile = 30,
    InvalidDbConfig = 31,
    InvalidFieldsFile = 32,
    InvalidInputFile = 33,
    UnsupportedType = 40,
    BadValue = 41,
    BadType = 42,
    BadAxes = 43,
    IoError = 44,
    NotFound = 45,
}

impl ExitCode {
    /// Exit code reported for a processing failure of `kind`
    pub fn for_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::UnsupportedType => Self::UnsupportedType,
            ErrorKind::BadValue => Self::BadValue,
            ErrorKind::BadType => Self::BadType,
            ErrorKind::BadAxes => Self::BadAxes,
            ErrorKind::Io => Self::IoError,
            ErrorKind::NotFound => Self::NotFound,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
    fn with_source(self, source: Box<dyn StdError + Send + Sync>) -> Self;
}

impl CliError {
    fn new(message: &str, category: ErrorCategory) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(message, ErrorCategory::General)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        Self::new(message, ErrorCategory::Misuse)
            .with_suggestion("Run 'fitsmeta --help' for usage information")
    }

    /// `--fits-file` does not name a readable file
    pub fn invalid_fits_path(path: &Path) -> Self {
        Self::new(
            &format!("'{}' is not a FITS file", path.display()),
            ErrorCategory::InvalidFitsPath,
        )
        .with_context("path", &path.display().to_string())
        .with_suggestion("Use --input-dir to process every FITS file in a directory")
    }

    /// `--input-dir` does not name a directory
    pub fn invalid_input_dir(path: &Path) -> Self {
        Self::new(
            &format!("'{}' is not a directory", path.display()),
            ErrorCategory::InvalidInputDir,
        )
        .with_context("path", &path.display().to_string())
    }

    /// `--table-name` is not `schema.table`, or no table is configured
    pub fn invalid_catalog_table(message: &str) -> Self {
        Self::new(message, ErrorCategory::InvalidCatalogTable)
            .with_suggestion("Pass --table-name <schema.table> or set the table in the DB config")
    }

    /// Aliases file is missing or unreadable
    pub fn invalid_alias_file(path: &Path, error: fitsmeta_core::Error) -> Self {
        Self::resource(path, "aliases file", ErrorCategory::InvalidAliasFile, error)
            .with_suggestion("An aliases file needs an [aliases] section with KEYWORD = alias lines")
    }

    /// Database configuration is missing or incomplete
    pub fn invalid_db_config(path: &Path, error: fitsmeta_core::Error) -> Self {
        Self::resource(path, "DB config", ErrorCategory::InvalidDbConfig, error).with_suggestion(
            "A DB config needs a [db_properties] section with db_uri, db_schema_name and db_user",
        )
    }

    /// Fields-info file is missing or unreadable
    pub fn invalid_fields_file(path: &Path, error: fitsmeta_core::Error) -> Self {
        Self::resource(path, "fields-info file", ErrorCategory::InvalidFieldsFile, error)
    }

    /// `--input-file` or stdin does not hold a metadata bundle
    pub fn invalid_input_file(source: &str, error: fitsmeta_core::Error) -> Self {
        Self::new(
            &format!("Cannot read a metadata bundle from {source}: {error}"),
            ErrorCategory::InvalidInputFile,
        )
        .with_source(Box::new(error))
        .with_suggestion("Pipe the JSON output of a source command into this one")
    }

    /// A resource flag is required but neither given nor configured
    pub fn missing_resource(flag: &str, config_key: &str) -> Self {
        let category = match flag {
            "--aliases" => ErrorCategory::InvalidAliasFile,
            "--db-config" => ErrorCategory::InvalidDbConfig,
            "--fields-info" => ErrorCategory::InvalidFieldsFile,
            _ => ErrorCategory::Misuse,
        };
        Self::new(&format!("No {flag} given"), category).with_suggestion(&format!(
            "Pass {flag} <path> or set resources.{config_key} in the config file"
        ))
    }

    /// A pipeline failed while processing an input
    pub fn processing(error: fitsmeta_core::Error) -> Self {
        let kind = error.kind();
        Self::new(&error.to_string(), ErrorCategory::Processing(kind)).with_source(Box::new(error))
    }

    fn resource(
        path: &Path,
        what: &str,
        category: ErrorCategory,
        error: fitsmeta_core::Error,
    ) -> Self {
        Self::new(&format!("Invalid {what}: {error}"), category)
            .with_context("path", &path.display().to_string())
            .with_source(Box::new(error))
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::InvalidFitsPath => ExitCode::InvalidFitsPath,
            ErrorCategory::InvalidInputDir => ExitCode::InvalidInputDir,
            ErrorCategory::InvalidCatalogTable => ExitCode::InvalidCatalogTable,
            ErrorCategory::InvalidAliasFile => ExitCode::InvalidAliasFile,
            ErrorCategory::InvalidDbConfig => ExitCode::InvalidDbConfig,
            ErrorCategory::InvalidFieldsFile => ExitCode::InvalidFieldsFile,
            ErrorCategory::InvalidInputFile => ExitCode::InvalidInputFile,
            ErrorCategory::Processing(kind) => ExitCode::for_kind(kind),
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::InvalidFitsPath | ErrorCategory::InvalidInputDir => "Input Error",
            ErrorCategory::InvalidCatalogTable => "Table Error",
            ErrorCategory::InvalidAliasFile
            | ErrorCategory::InvalidDbConfig
            | ErrorCategory::InvalidFieldsFile
            | ErrorCategory::InvalidInputFile => "Config Error",
            ErrorCategory::Processing(_) => "Processing Error",
        }
    }

    /// Message, context, cause chain (with `debug`) and hints, one per line
    pub fn format_for_user(&self, debug: bool) -> String {
        use std::fmt::Write as _;

        let label = match self.category {
            ErrorCategory::Misuse => self.label().yellow(),
            _ => self.label().red(),
        };
        let mut out = format!("{label}: {}\n", self.message);

        if !self.context.is_empty() {
            out.push_str("\nContext:\n");
            for (key, value) in &self.context {
                let _ = writeln!(out, "  {}: {value}", key.bold());
            }
        }

        if debug && let Some(source) = &self.source {
            out.push_str("\nCaused by:\n");
            let chain = std::iter::successors(Some(source.as_ref() as &(dyn StdError + 'static)), |e| (*e).source());
            for (depth, cause) in chain.enumerate() {
                let _ = writeln!(out, "  {}: {cause}", depth + 1);
            }
        }

        if !self.suggestions.is_empty() {
            out.push_str("\nSuggestions:\n");
            for hint in &self.suggestions {
                let _ = writeln!(out, "  • {hint}");
            }
        }
        out
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;
        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }
        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }

    fn with_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }
}

/// Configuration loading reports through anyhow
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        Self::general(&format!("{error:#}"))
    }
}

impl From<fitsmeta_core::Error> for CliError {
    fn from(error: fitsmeta_core::Error) -> Self {
        Self::processing(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitsmeta_core::error::{FitsError, IoError, ValidationError};

    #[test]
    fn test_processing_codes_follow_error_kind() {
        let err = CliError::processing(FitsError::unsupported("not an image").into());
        assert_eq!(err.exit_code(), ExitCode::UnsupportedType);
        assert_eq!(err.exit_code().code(), 40);

        let err = CliError::processing(IoError::object_not_found("/zone/a.fits").into());
        assert_eq!(err.exit_code().code(), 45);

        let err = CliError::processing(ValidationError::bad_value("NAXIS1 missing").into());
        assert_eq!(err.exit_code().code(), 41);
    }

    #[test]
    fn test_input_and_resource_codes() {
        let path = Path::new("/data/missing.fits");
        assert_eq!(CliError::invalid_fits_path(path).exit_code().code(), 20);
        assert_eq!(CliError::invalid_input_dir(path).exit_code().code(), 21);
        assert_eq!(CliError::invalid_catalog_table("bad").exit_code().code(), 22);
        assert_eq!(
            CliError::missing_resource("--aliases", "aliases_file")
                .exit_code()
                .code(),
            30
        );
        assert_eq!(
            CliError::missing_resource("--db-config", "db_config_file")
                .exit_code()
                .code(),
            31
        );
        assert_eq!(
            CliError::missing_resource("--fields-info", "fields_info_file")
                .exit_code()
                .code(),
            32
        );
    }

    #[test]
    fn test_format_for_user_lists_context_and_suggestions() {
        colored::control::set_override(false);
        let err = CliError::invalid_fits_path(Path::new("/data/x.fits"));
        let text = err.format_for_user(false);
        assert!(text.starts_with("Input Error: '/data/x.fits' is not a FITS file"));
        assert!(text.contains("path: /data/x.fits"));
        assert!(text.contains("--input-dir"));
    }

    #[test]
    fn test_debug_output_shows_cause_chain() {
        colored::control::set_override(false);
        let err = CliError::invalid_fields_file(
            Path::new("fields.toml"),
            ValidationError::unknown_datatype("complex").into(),
        );
        assert!(err.format_for_user(true).contains("Caused by:"));
        assert!(!err.format_for_user(false).contains("Caused by:"));
    }
}
