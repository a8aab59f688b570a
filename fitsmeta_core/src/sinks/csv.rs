use super::OutputTarget;
use crate::Result;
use crate::bundle::MetadataBundle;
use crate::error::ValidationError;
use crate::pipeline::{Sink, Stage};

/// Writes `calculated` as one CSV row under a header of its sorted keys
///
/// When appending to a file that already has content the existing header is
/// kept and each row follows its column order, so a directory scan can append
/// one row per image. Keys missing from a bundle leave an empty cell; keys the
/// header does not name are a bad value.
#[derive(Debug, Clone, Default)]
pub struct CsvSink {
    target: OutputTarget,
}

impl CsvSink {
    pub fn new(target: OutputTarget) -> Self {
        Self { target }
    }

    fn existing_header(&self) -> Result<Option<Vec<String>>> {
        let OutputTarget::File { path, .. } = &self.target else {
            return Ok(None);
        };
        if !self.target.appends_to_content() {
            return Ok(None);
        }
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        Ok(Some(reader.headers()?.iter().map(str::to_string).collect()))
    }
}

impl Stage for CsvSink {
    fn process(&mut self, bundle: MetadataBundle) -> Result<MetadataBundle> {
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "csv_out"
    }
}

impl Sink for CsvSink {
    fn output_results(&mut self, bundle: &MetadataBundle) -> Result<()> {
        let calculated = bundle.require_calculated()?;
        let header = self.existing_header()?;

        let row: Vec<String> = match &header {
            None => calculated.values().map(|v| v.to_string()).collect(),
            Some(columns) => {
                let unknown: Vec<&str> = calculated
                    .keys()
                    .filter(|key| !columns.contains(*key))
                    .map(String::as_str)
                    .collect();
                if !unknown.is_empty() {
                    return Err(ValidationError::bad_value(format!(
                        "CSV output already has columns {}; cannot append {}",
                        columns.join(","),
                        unknown.join(",")
                    ))
                    .into());
                }
                columns
                    .iter()
                    .map(|column| calculated.get(column).map(|v| v.to_string()).unwrap_or_default())
                    .collect()
            }
        };

        let mut writer = ::csv::WriterBuilder::new().from_writer(self.target.open()?);
        if header.is_none() {
            writer.write_record(calculated.keys())?;
        }
        writer.write_record(&row)?;
        writer.flush().map_err(|e| self.target.io_error(e))?;
        Ok(())
    }
}
