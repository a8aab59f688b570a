//! SQL statement generation for ObsCore rows and catalog tables
//!
//! Statements use `%s` placeholders and carry their values separately.
//! Identifiers go through [`sanitize`]; values are never spliced into the
//! SQL text except by [`Statement::render`], which exists for human-readable
//! scripts only.

use super::OutputTarget;
use crate::Result;
use crate::bundle::{Aliased, ColumnInfo, FieldsInfo, MetadataBundle};
use crate::config::{CatalogAliasSets, TableName};
use crate::error::ValidationError;
use crate::fits::fits_format_to_sql;
use crate::pipeline::{Sink, Stage};
use crate::value::Value;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Columns of the hybrid table, in insert order, before `metadata`
pub const HYBRID_COLUMNS: [&str; 5] = ["md5sum", "s_dec", "s_ra", "is_public", "obs_collection"];

/// A value bound to a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Json(serde_json::Value),
}

impl SqlValue {
    /// SQL literal for display in scripts
    pub fn literal(&self) -> String {
        match self {
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) if f.is_finite() => f.to_string(),
            Self::Float(_) => "'NaN'".to_string(),
            Self::Text(s) => quote(s),
            Self::Timestamp(t) => quote(&t.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Self::Json(j) => format!("{}::jsonb", quote(&j.to_string())),
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Integer(i) => Self::Integer(*i),
            Value::Float(f) => Self::Float(*f),
            Value::Text(s) => Self::Text(s.clone()),
            Value::Timestamp(t) => Self::Timestamp(*t),
            Value::Array(_) => {
                Self::Json(serde_json::to_value(value).unwrap_or(serde_json::Value::Null))
            }
        }
    }
}

/// SQL text with `%s` placeholders and the values bound to them
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    /// Statement without parameters
    pub fn plain(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// SQL with each placeholder replaced by its value's literal
    pub fn render(&self) -> String {
        let mut values = self.values.iter();
        let mut out = String::with_capacity(self.sql.len());
        let mut rest = self.sql.as_str();
        while let Some(pos) = rest.find("%s") {
            out.push_str(&rest[..pos]);
            match values.next() {
                Some(value) => out.push_str(&value.literal()),
                None => out.push_str("%s"),
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Keep only ASCII letters, digits and underscores
pub fn sanitize(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn qualified(table: &TableName) -> String {
    format!("{}.{}", sanitize(&table.schema), sanitize(&table.table))
}

fn placeholders(n: usize) -> String {
    vec!["%s"; n].join(", ")
}

/// Rewrite `%s` placeholders as PostgreSQL's `$1`, `$2`, ...
pub fn to_numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    let mut n = 0;
    while let Some(pos) = rest.find("%s") {
        n += 1;
        out.push_str(&rest[..pos]);
        out.push_str(&format!("${n}"));
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// Insert one ObsCore row, columns in sorted key order
///
/// With `fields` the row is limited to the ObsCore fields it names; working
/// values such as corner coordinates stay out of the table.
pub fn insert_row(
    table: &TableName,
    calculated: &BTreeMap<String, Value>,
    fields: Option<&FieldsInfo>,
) -> Result<Statement> {
    let row: Vec<(&String, &Value)> = calculated
        .iter()
        .filter(|(key, _)| fields.is_none_or(|f| f.contains_key(*key)))
        .collect();
    if row.is_empty() {
        return Err(ValidationError::bad_value("no calculated values to insert").into());
    }
    let columns: Vec<String> = row.iter().map(|(k, _)| sanitize(k)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        qualified(table),
        columns.join(", "),
        placeholders(columns.len())
    );
    Ok(Statement::new(sql, row.into_iter().map(|(_, v)| SqlValue::from(v)).collect()))
}

/// Insert into the hybrid table: fixed columns plus the whole record as JSON
pub fn insert_hybrid(table: &TableName, calculated: &BTreeMap<String, Value>) -> Result<Statement> {
    let missing: Vec<String> = HYBRID_COLUMNS
        .iter()
        .filter(|c| !calculated.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::missing_fields(missing).into());
    }

    let mut values: Vec<SqlValue> = HYBRID_COLUMNS
        .iter()
        .filter_map(|c| calculated.get(*c))
        .map(SqlValue::from)
        .collect();
    values.push(SqlValue::Json(serde_json::to_value(calculated)?));

    let sql = format!(
        "INSERT INTO {} ({}, metadata) VALUES ({});",
        qualified(table),
        HYBRID_COLUMNS.join(", "),
        placeholders(HYBRID_COLUMNS.len() + 1)
    );
    Ok(Statement::new(sql, values))
}

/// DDL for a catalog table with its ownership and indexes
///
/// The q3c index goes on the first RA and first DEC column; B-tree indexes
/// follow on every ID column, then every DEC column, then every RA column.
pub fn create_table(
    table: &TableName,
    column_info: &ColumnInfo,
    aliased: &[String],
    db_user: &str,
    alias_sets: &CatalogAliasSets,
) -> Result<Vec<Statement>> {
    if aliased.len() != column_info.format.len() {
        return Err(ValidationError::bad_value(format!(
            "{} aliased names for {} columns",
            aliased.len(),
            column_info.format.len()
        ))
        .into());
    }

    let names: Vec<String> = aliased.iter().map(|n| sanitize(n)).collect();
    let mut declarations = Vec::with_capacity(names.len());
    for (name, tform) in names.iter().zip(&column_info.format) {
        declarations.push(format!("{name} {}", fits_format_to_sql(tform)?));
    }

    let full = qualified(table);
    let bare = sanitize(&table.table);
    let mut statements = vec![
        Statement::plain(format!("CREATE TABLE {full} ({});", declarations.join(", "))),
        Statement::plain(format!("ALTER TABLE {full} OWNER TO {};", sanitize(db_user))),
    ];

    let ra = members(&names, aliased, &alias_sets.ra);
    let dec = members(&names, aliased, &alias_sets.dec);
    let id = members(&names, aliased, &alias_sets.id);

    if let (Some(ra), Some(dec)) = (ra.first(), dec.first()) {
        statements.push(Statement::plain(format!(
            "CREATE INDEX {bare}_q3c_idx ON {full} (public.q3c_ang2ipix({ra}, {dec}));"
        )));
        statements.push(Statement::plain(format!(
            "ALTER TABLE {full} CLUSTER ON {bare}_q3c_idx;"
        )));
    }

    for column in id.iter().chain(&dec).chain(&ra) {
        statements.push(Statement::plain(format!(
            "CREATE INDEX {bare}_{column}_idx ON {full} ({column});"
        )));
    }
    Ok(statements)
}

/// Sanitized names whose alias belongs to `set`, in column order
fn members<'a>(names: &'a [String], aliased: &[String], set: &[String]) -> Vec<&'a String> {
    names
        .iter()
        .zip(aliased)
        .filter(|(_, alias)| set.contains(*alias))
        .map(|(name, _)| name)
        .collect()
}

/// One insert per table row
pub fn fill_rows(table: &TableName, columns: &[String], rows: &[Vec<Value>]) -> Result<Vec<Statement>> {
    let names: Vec<String> = columns.iter().map(|c| sanitize(c)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        qualified(table),
        names.join(", "),
        placeholders(names.len())
    );

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() != names.len() {
                return Err(ValidationError::bad_value(format!(
                    "row {i} has {} values for {} columns",
                    row.len(),
                    names.len()
                ))
                .into());
            }
            Ok(Statement::new(sql.clone(), row.iter().map(SqlValue::from).collect()))
        })
        .collect()
}

/// Catalog used to decide whether a table exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistenceQuery {
    /// Every table in the schema
    #[default]
    PgCatalog,
    /// Tables registered for TAP, which are catalog tables only
    TapSchema,
}

impl FromStr for ExistenceQuery {
    type Err = crate::Error;

    /// `pg_catalog` or `tap_schema`, as written in the database configuration
    fn from_str(text: &str) -> Result<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "pg_catalog" => Ok(Self::PgCatalog),
            "tap_schema" => Ok(Self::TapSchema),
            other => Err(ValidationError::invalid_configuration(format!(
                "unknown table existence catalog '{other}', expected pg_catalog or tap_schema"
            ))
            .into()),
        }
    }
}

impl ExistenceQuery {
    /// Query returning one table name per row for `table`'s schema
    pub fn statement(self, table: &TableName) -> Statement {
        let sql = match self {
            Self::PgCatalog => "SELECT tablename FROM pg_catalog.pg_tables WHERE schemaname = %s;",
            Self::TapSchema => "SELECT table_name FROM tap_schema.tables WHERE schema_name = %s;",
        };
        Statement::new(sql, vec![SqlValue::Text(table.schema.clone())])
    }

    /// Whether `names` returned by [`Self::statement`] include `table`
    pub fn contains(self, names: &[String], table: &TableName) -> bool {
        let qualified = table.to_string();
        names
            .iter()
            .any(|n| n == &table.table || n == &qualified)
    }
}

/// What a SQL sink does with a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlMode {
    /// Insert `calculated` into the ObsCore table
    ObsCoreRow,
    /// Insert `calculated` into the hybrid table
    HybridRow,
    /// Create a catalog table from `column_info` and `aliased`
    CreateTable,
    /// Insert every `data` row into a catalog table
    FillCatalog,
}

impl SqlMode {
    /// Statements for `bundle`
    pub fn statements(
        self,
        bundle: &MetadataBundle,
        table: &TableName,
        db_user: &str,
        alias_sets: &CatalogAliasSets,
    ) -> Result<Vec<Statement>> {
        match self {
            Self::ObsCoreRow => Ok(vec![insert_row(
                table,
                bundle.require_calculated()?,
                bundle.fields_info.as_ref(),
            )?]),
            Self::HybridRow => Ok(vec![insert_hybrid(table, bundle.require_calculated()?)?]),
            Self::CreateTable => {
                let columns = bundle.require_column_info()?;
                create_table(table, columns, &catalog_names(bundle)?, db_user, alias_sets)
            }
            Self::FillCatalog => {
                let rows = bundle
                    .data
                    .as_ref()
                    .ok_or_else(|| ValidationError::missing_section("data"))?;
                fill_rows(table, &catalog_names(bundle)?, rows)
            }
        }
    }
}

/// Aliased column names, or the original names when no alias stage ran
fn catalog_names(bundle: &MetadataBundle) -> Result<Vec<String>> {
    match &bundle.aliased {
        Some(Aliased::Columns(names)) => Ok(names.clone()),
        Some(Aliased::Fields(_)) => Err(ValidationError::bad_value(
            "catalog SQL needs a column list in 'aliased', found a keyword map",
        )
        .into()),
        None => Ok(bundle.require_column_info()?.name.clone()),
    }
}

/// Writes the statements for each bundle as a readable SQL script
#[derive(Debug, Clone)]
pub struct SqlScriptSink {
    mode: SqlMode,
    table: TableName,
    db_user: String,
    alias_sets: CatalogAliasSets,
    target: OutputTarget,
}

impl SqlScriptSink {
    pub fn new(mode: SqlMode, table: TableName, db_user: impl Into<String>, target: OutputTarget) -> Self {
        Self {
            mode,
            table,
            db_user: db_user.into(),
            alias_sets: CatalogAliasSets::default(),
            target,
        }
    }

    pub fn with_alias_sets(mut self, alias_sets: CatalogAliasSets) -> Self {
        self.alias_sets = alias_sets;
        self
    }

    /// Rendered script text for `bundle`
    pub fn script(&self, bundle: &MetadataBundle) -> Result<String> {
        let statements = self
            .mode
            .statements(bundle, &self.table, &self.db_user, &self.alias_sets)?;
        Ok(statements.iter().map(|s| format!("{}\n", s.render())).collect())
    }
}

impl Stage for SqlScriptSink {
    fn process(&mut self, bundle: MetadataBundle) -> Result<MetadataBundle> {
        Ok(bundle)
    }

    fn name(&self) -> &str {
        match self.mode {
            SqlMode::ObsCoreRow | SqlMode::HybridRow => "sql_insert",
            SqlMode::CreateTable => "sql_create_table",
            SqlMode::FillCatalog => "sql_fill",
        }
    }
}

impl Sink for SqlScriptSink {
    fn output_results(&mut self, bundle: &MetadataBundle) -> Result<()> {
        self.target.write_all(&self.script(bundle)?)
    }
}
