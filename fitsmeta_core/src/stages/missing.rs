//! Reports schema fields the calculator could not fill

use crate::Result;
use crate::bundle::MetadataBundle;
use crate::error::IoError;
use crate::pipeline::Stage;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Layout of the written report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// One line per missing field
    #[default]
    Text,
    /// JSON array of the same lines
    Json,
}

/// Warns about every field in `fields_info` that is absent from `calculated`
#[derive(Debug, Clone, Default)]
pub struct MissingFieldReporter {
    format: ReportFormat,
    report_file: Option<PathBuf>,
}

impl MissingFieldReporter {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            report_file: None,
        }
    }

    /// Also write the report to `path`
    pub fn with_report_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_file = Some(path.into());
        self
    }

    /// `Required: field` or `Optional: field` for each missing field
    pub fn missing_lines(bundle: &MetadataBundle) -> Vec<String> {
        let Some(fields_info) = &bundle.fields_info else {
            return Vec::new();
        };
        fields_info
            .iter()
            .filter(|(field, _)| {
                !bundle
                    .calculated
                    .as_ref()
                    .is_some_and(|c| c.contains_key(field.as_str()))
            })
            .map(|(field, spec)| {
                let class = if spec.required { "Required" } else { "Optional" };
                format!("{class}: {field}")
            })
            .collect()
    }

    /// Render `lines` in the configured format
    pub fn render(&self, lines: &[String]) -> Result<String> {
        Ok(match self.format {
            ReportFormat::Text => lines.iter().map(|l| format!("{l}\n")).collect(),
            ReportFormat::Json => serde_json::to_string_pretty(lines)?,
        })
    }
}

impl Stage for MissingFieldReporter {
    fn process(&mut self, bundle: MetadataBundle) -> Result<MetadataBundle> {
        let lines = Self::missing_lines(&bundle);
        for line in &lines {
            warn!("Missing field {line}");
        }

        if let Some(path) = &self.report_file {
            let report = self.render(&lines)?;
            std::fs::write(path, report).map_err(|e| IoError::from_std(e).with_path(path))?;
        }
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "miss_report"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{FieldSpec, FieldsInfo};
    use crate::value::Value;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn bundle() -> MetadataBundle {
        let fields_info: FieldsInfo = [
            ("s_ra", true),
            ("s_dec", true),
            ("obs_title", false),
            ("calib_level", true),
        ]
        .into_iter()
        .map(|(name, required)| {
            (
                name.to_string(),
                FieldSpec {
                    required,
                    ..FieldSpec::default()
                },
            )
        })
        .collect();

        MetadataBundle {
            fields_info: Some(fields_info),
            calculated: Some(BTreeMap::from([
                ("s_ra".to_string(), Value::Float(1.0)),
                ("s_dec".to_string(), Value::Float(2.0)),
            ])),
            ..MetadataBundle::default()
        }
    }

    #[test]
    fn test_missing_lines_classify_fields() {
        assert_eq!(
            MissingFieldReporter::missing_lines(&bundle()),
            vec!["Required: calib_level", "Optional: obs_title"]
        );
    }

    #[test]
    fn test_bundle_passes_through() {
        let input = bundle();
        let output = MissingFieldReporter::default().process(input.clone()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_json_report_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let mut reporter = MissingFieldReporter::new(ReportFormat::Json).with_report_file(&path);
        reporter.process(bundle()).unwrap();

        let lines: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(lines, vec!["Required: calib_level", "Optional: obs_title"]);
    }

    #[test]
    fn test_text_report() {
        let reporter = MissingFieldReporter::new(ReportFormat::Text);
        let text = reporter
            .render(&MissingFieldReporter::missing_lines(&bundle()))
            .unwrap();
        assert_eq!(text, "Required: calib_level\nOptional: obs_title\n");
    }
}
