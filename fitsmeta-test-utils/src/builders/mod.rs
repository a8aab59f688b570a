//! On-disk fixtures for pipeline tests

use fitsmeta_core::test_utils::FitsBuilder;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Aliases used by [`jwst_image`] headers
pub const IMAGE_ALIASES: &[(&str, &str)] = &[
    ("FILTER", "filter"),
    ("MODULE", "nircam_module"),
    ("EXPTIME", "t_exptime"),
    ("NAXIS1", "s_xel1"),
    ("NAXIS2", "s_xel2"),
    ("TELESCOP", "facility_name"),
];

/// Fields-info document covering the calculated ObsCore fields
pub const FIELDS_INFO_TOML: &str = r#"
[s_ra]
required = true
datatype = "double"

[s_dec]
required = true
datatype = "double"

[im_naxis1]
required = true
datatype = "integer"

[im_naxis2]
required = true
datatype = "integer"

[im_pixtype]
required = true

[s_resolution]
required = false
datatype = "double"

[instrument_name]
required = true

[target_name]
required = false

[access_url]
required = true

[calib_level]
required = true
default = "3"
datatype = "integer"

[dataproduct_type]
required = true
default = "image"
datatype = "string"

[obs_publisher_did]
required = false
"#;

/// NIRCam mosaic with a TAN WCS centred on GOODS-South
pub fn jwst_image() -> FitsBuilder {
    FitsBuilder::image(100, 80)
        .bitpix(-32)
        .card("TELESCOP", "JWST")
        .card("INSTRUME", "NIRCAM")
        .card("FILTER", "F200W")
        .card("MODULE", "A")
        .card("EXPTIME", 0.0)
        .tan_wcs(53.16, -27.78, 8.5e-6)
}

/// Primary HDU plus a three-column binary table
pub fn sample_catalog(rows: usize) -> FitsBuilder {
    FitsBuilder::primary_only().bintable(&[("ID", "K"), ("RA", "D"), ("DEC", "D")], rows)
}

/// Temporary directory holding FITS and resource files
#[derive(Debug)]
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Create a new empty fixture directory
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path inside the fixture, without creating anything
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a text file
    pub fn write(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Write a FITS file built by `builder`
    pub fn fits(&self, name: &str, builder: &FitsBuilder) -> std::io::Result<PathBuf> {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        builder.write_to(&path)?;
        Ok(path)
    }

    /// Write an `[aliases]` INI file
    pub fn aliases(&self, name: &str, pairs: &[(&str, &str)]) -> std::io::Result<PathBuf> {
        let mut text = String::from("[aliases]\n");
        for (source, target) in pairs {
            text.push_str(&format!("{source} = {target}\n"));
        }
        self.write(name, &text)
    }

    /// Write the default fields-info document
    pub fn fields_info(&self, name: &str) -> std::io::Result<PathBuf> {
        self.write(name, FIELDS_INFO_TOML)
    }

    /// Write a `[db_properties]` INI file
    pub fn db_config(&self, name: &str, table: &str) -> std::io::Result<PathBuf> {
        let text = format!(
            "[db_properties]\n\
             db_uri = postgresql://archive@localhost/vos\n\
             db_schema_name = sia\n\
             db_user = archive\n\
             db_table_name = {table}\n\
             db_hybrid_table_name = hybrid\n\
             db_catalog_table_name = catalogs\n\
             db_existence_query = pg_catalog\n"
        );
        self.write(name, &text)
    }
}
