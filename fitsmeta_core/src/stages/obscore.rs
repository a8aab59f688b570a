//! ObsCore field calculation from headers, aliases, defaults and WCS

use crate::Result;
use crate::bundle::{Aliased, FieldsInfo, FileInfo, MetadataBundle};
use crate::config::ObsCoreConfig;
use crate::error::ValidationError;
use crate::fits::{Header, PixelType, WcsInfo, WcsSolver};
use crate::pipeline::Stage;
use crate::value::{Datatype, Value};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// Exposure time substituted when a header reports zero
const DEFAULT_EXPTIME: f64 = 1347.0;

/// FWHM of the NIRCam PSF per filter, in arcseconds
static FILTER_RESOLUTION: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("F070W", 0.030),
        ("F090W", 0.034),
        ("F115W", 0.040),
        ("F140M", 0.048),
        ("F150W", 0.050),
        ("F150W2", 0.046),
        ("F162M", 0.055),
        ("F164N", 0.056),
        ("F182M", 0.062),
        ("F187N", 0.064),
        ("F200W", 0.066),
        ("F210M", 0.071),
        ("F212N", 0.072),
        ("F250M", 0.084),
        ("F277W", 0.092),
        ("F300M", 0.100),
        ("F322W2", 0.097),
        ("F323N", 0.108),
        ("F335M", 0.111),
        ("F356W", 0.116),
        ("F360M", 0.120),
        ("F405N", 0.131),
        ("F410M", 0.133),
        ("F430M", 0.140),
        ("F444W", 0.145),
        ("F460M", 0.151),
        ("F466N", 0.152),
        ("F470N", 0.155),
        ("F480M", 0.157),
    ])
});

/// Angular resolution of a filter, case-insensitive
pub fn filter_resolution(filter: &str) -> Option<f64> {
    FILTER_RESOLUTION
        .get(filter.trim().to_ascii_uppercase().as_str())
        .copied()
}

type Fields = BTreeMap<String, Value>;

/// Insert a float unless it is NaN or infinite
fn set_float(fields: &mut Fields, key: &str, value: f64) {
    if value.is_finite() {
        fields.insert(key.to_string(), Value::Float(value));
    }
}

/// Builds the `calculated` section
#[derive(Debug)]
pub struct ObsCoreCalculator {
    config: ObsCoreConfig,
    solver: Box<dyn WcsSolver>,
}

impl ObsCoreCalculator {
    pub fn new(config: ObsCoreConfig, solver: Box<dyn WcsSolver>) -> Self {
        Self { config, solver }
    }

    fn seed_from_wcs(wcs: &WcsInfo) -> Fields {
        let mut fields = Fields::new();
        set_float(&mut fields, "im_scale", wcs.pixel_scale[0]);
        for (i, (ra, dec)) in wcs.corners.iter().enumerate() {
            set_float(&mut fields, &format!("im_ra{}", i + 1), *ra);
            set_float(&mut fields, &format!("im_dec{}", i + 1), *dec);
        }
        let ((ra_min, ra_max), (dec_min, dec_max)) = wcs.bounds();
        set_float(&mut fields, "spat_lolimit1", ra_min);
        set_float(&mut fields, "spat_hilimit1", ra_max);
        set_float(&mut fields, "spat_lolimit2", dec_min);
        set_float(&mut fields, "spat_hilimit2", dec_max);
        fields
    }

    fn calculate(&self, bundle: &MetadataBundle) -> Result<Fields> {
        let headers = bundle.require_headers()?;
        let wcs = self.solver.solve(headers)?;
        let mut calculated = Self::seed_from_wcs(&wcs);

        match &bundle.aliased {
            Some(Aliased::Fields(aliased)) => {
                calculated.extend(aliased.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(Aliased::Columns(_)) => {
                return Err(ValidationError::bad_value(
                    "ObsCore values need image aliases, found a catalog column list",
                )
                .into());
            }
            None => {}
        }

        if calculated.get("t_exptime").and_then(Value::as_f64) == Some(0.0) {
            calculated.insert("t_exptime".to_string(), Value::Float(DEFAULT_EXPTIME));
        }
        if let Some(collection) = &self.config.collection {
            calculated.insert("obs_collection".to_string(), Value::Text(collection.clone()));
        }

        let empty = FieldsInfo::new();
        let fields_info = bundle.fields_info.as_ref().unwrap_or(&empty);
        let file_info = bundle.file_info.as_ref();
        for field in fields_info.keys() {
            self.calculate_field(field, &mut calculated, headers, &wcs, file_info)?;
            if calculated.contains_key(field) {
                continue;
            }
            if let Some(default) = bundle.defaults.as_ref().and_then(|d| d.get(field)) {
                calculated.insert(field.clone(), default.clone());
            }
        }

        coerce_by_datatype(&mut calculated, fields_info)?;
        Ok(calculated)
    }

    fn calculate_field(
        &self,
        field: &str,
        calculated: &mut Fields,
        headers: &Header,
        wcs: &WcsInfo,
        file_info: Option<&FileInfo>,
    ) -> Result<()> {
        match field {
            "s_ra" | "s_dec" => {
                if calculated.contains_key("s_ra") && calculated.contains_key("s_dec") {
                    return Ok(());
                }
                let (ra, dec) = wcs.ra_dec()?;
                set_float(calculated, "s_ra", ra);
                set_float(calculated, "s_dec", dec);
            }
            "im_naxis1" | "im_naxis2" => {
                let source = if field == "im_naxis1" { "s_xel1" } else { "s_xel2" };
                if let Some(value) = calculated.get(source).cloned() {
                    calculated.insert(field.to_string(), value);
                }
            }
            "s_resolution" => {
                let resolution = calculated
                    .get("filter")
                    .and_then(Value::as_str)
                    .and_then(filter_resolution);
                if let Some(resolution) = resolution {
                    calculated.insert(field.to_string(), Value::Float(resolution));
                }
            }
            "im_pixtype" => {
                let label = match headers.get_int("BITPIX").map(PixelType::from_bitpix) {
                    Some(PixelType::Unknown) | None => "UNKNOWN",
                    Some(pixel_type) => pixel_type.label(),
                };
                calculated.insert(field.to_string(), Value::Text(label.to_string()));
            }
            "access_url" => {
                if let Some(info) = file_info {
                    let url = format!(
                        "{}{}{}",
                        self.config.url_prefix, self.config.image_mount_path, info.file_path
                    );
                    calculated.insert(field.to_string(), Value::Text(url));
                }
            }
            "instrument_name" => {
                let name = match calculated.get("nircam_module") {
                    Some(module) if !module.to_string().trim().is_empty() => {
                        format!("NIRCam-{}", module.to_string().trim())
                    }
                    _ => "NIRCam".to_string(),
                };
                calculated.insert(field.to_string(), Value::Text(name));
            }
            "target_name" => {
                if let Some(info) = file_info {
                    let target = target_from_file_name(&info.file_name);
                    calculated.insert(field.to_string(), Value::Text(target.to_string()));
                }
            }
            "md5sum" => {
                if let Some(md5sum) = file_info.and_then(|i| i.md5sum.clone()) {
                    calculated.insert(field.to_string(), Value::Text(md5sum));
                }
            }
            "file_size" => {
                if let Some(info) = file_info {
                    calculated.insert(field.to_string(), Value::Integer(info.file_size as i64));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Survey field guessed from the file name
fn target_from_file_name(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.starts_with("goods_s") {
        "goods_south"
    } else if lower.starts_with("goods_n") {
        "goods_north"
    } else {
        "UNKNOWN"
    }
}

/// Convert text values of typed fields, for example dates read from headers
fn coerce_by_datatype(calculated: &mut Fields, fields_info: &FieldsInfo) -> Result<()> {
    for (field, spec) in fields_info {
        let Some(label) = &spec.datatype else {
            continue;
        };
        let datatype = Datatype::parse(label)?;
        if let Some(value) = calculated.remove(field) {
            calculated.insert(field.clone(), value.coerce(datatype)?);
        }
    }
    Ok(())
}

impl Stage for ObsCoreCalculator {
    fn process(&mut self, mut bundle: MetadataBundle) -> Result<MetadataBundle> {
        let calculated = self.calculate(&bundle)?;
        debug!("Calculated {} ObsCore fields", calculated.len());
        bundle.calculated = Some(calculated);
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "obscore_calc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::FieldSpec;
    use crate::error::ErrorKind;
    use crate::fits::{FixedWcs, LinearTanSolver};
    use std::path::Path;

    fn fixed_wcs(ctype1: &str, ctype2: &str) -> Box<FixedWcs> {
        Box::new(FixedWcs(WcsInfo {
            crval: [53.15, -27.8],
            ctype: [ctype1.to_string(), ctype2.to_string()],
            corners: [(53.2, -27.85), (53.2, -27.75), (53.1, -27.75), (53.1, -27.85)],
            pixel_scale: [8.3e-6, 8.3e-6],
        }))
    }

    fn fields(names: &[&str]) -> FieldsInfo {
        names
            .iter()
            .map(|n| (n.to_string(), FieldSpec::default()))
            .collect()
    }

    fn bundle(aliased: Fields, fields_info: FieldsInfo) -> MetadataBundle {
        let mut headers = Header::new();
        headers.insert("BITPIX", -32i64);
        MetadataBundle {
            file_info: Some(FileInfo::local(
                Path::new("/data/goods_n_f444w_i2d.fits"),
                2880,
                Some("0123456789abcdef0123456789abcdef".into()),
            )),
            headers: Some(headers),
            aliased: Some(Aliased::Fields(aliased)),
            fields_info: Some(fields_info),
            defaults: Some(Fields::new()),
            ..MetadataBundle::default()
        }
    }

    fn calculator(config: ObsCoreConfig) -> ObsCoreCalculator {
        ObsCoreCalculator::new(config, fixed_wcs("RA---TAN", "DEC--TAN"))
    }

    #[test]
    fn test_wcs_seed_values() {
        let mut stage = calculator(ObsCoreConfig::default());
        let out = stage.process(bundle(Fields::new(), FieldsInfo::new())).unwrap();
        let calculated = out.calculated.unwrap();
        assert_eq!(calculated["im_scale"], Value::Float(8.3e-6));
        assert_eq!(calculated["im_ra1"], Value::Float(53.2));
        assert_eq!(calculated["im_dec3"], Value::Float(-27.75));
        assert_eq!(calculated["spat_lolimit1"], Value::Float(53.1));
        assert_eq!(calculated["spat_hilimit1"], Value::Float(53.2));
        assert_eq!(calculated["spat_lolimit2"], Value::Float(-27.85));
        assert_eq!(calculated["spat_hilimit2"], Value::Float(-27.75));
    }

    #[test]
    fn test_per_field_rules() {
        let config = ObsCoreConfig {
            collection: Some("JWST".into()),
            url_prefix: "https://archive.example.org".into(),
            image_mount_path: "/vos".into(),
        };
        let aliased = Fields::from([
            ("s_xel1".to_string(), Value::Integer(512)),
            ("s_xel2".to_string(), Value::Integer(256)),
            ("filter".to_string(), Value::Text("f444w".into())),
            ("nircam_module".to_string(), Value::Text("B".into())),
            ("t_exptime".to_string(), Value::Float(0.0)),
        ]);
        let names = [
            "s_ra",
            "s_dec",
            "im_naxis1",
            "im_naxis2",
            "s_resolution",
            "im_pixtype",
            "access_url",
            "instrument_name",
            "target_name",
            "md5sum",
            "file_size",
        ];

        let out = calculator(config)
            .process(bundle(aliased.clone(), fields(&names)))
            .unwrap();
        let calculated = out.calculated.unwrap();

        assert_eq!(calculated["s_ra"], Value::Float(53.15));
        assert_eq!(calculated["s_dec"], Value::Float(-27.8));
        assert_eq!(calculated["im_naxis1"], Value::Integer(512));
        assert_eq!(calculated["im_naxis2"], Value::Integer(256));
        assert_eq!(calculated["s_resolution"], Value::Float(0.145));
        assert_eq!(calculated["im_pixtype"], Value::Text("float".into()));
        assert_eq!(
            calculated["access_url"],
            Value::Text("https://archive.example.org/vos/data/goods_n_f444w_i2d.fits".into())
        );
        assert_eq!(calculated["instrument_name"], Value::Text("NIRCam-B".into()));
        assert_eq!(calculated["target_name"], Value::Text("goods_north".into()));
        assert_eq!(calculated["md5sum"].as_str().map(str::len), Some(32));
        assert_eq!(calculated["file_size"], Value::Integer(2880));
        assert_eq!(calculated["t_exptime"], Value::Float(DEFAULT_EXPTIME));
        assert_eq!(calculated["obs_collection"], Value::Text("JWST".into()));

        for key in aliased.keys() {
            assert!(calculated.contains_key(key), "{key} missing");
        }
    }

    #[test]
    fn test_swapped_axes() {
        let mut stage = ObsCoreCalculator::new(ObsCoreConfig::default(), fixed_wcs("DEC--TAN", "RA---TAN"));
        let calculated = stage
            .process(bundle(Fields::new(), fields(&["s_ra"])))
            .unwrap()
            .calculated
            .unwrap();
        assert_eq!(calculated["s_ra"], Value::Float(-27.8));
        assert_eq!(calculated["s_dec"], Value::Float(53.15));
    }

    #[test]
    fn test_unmappable_axes_are_bad_axes() {
        let mut stage = ObsCoreCalculator::new(ObsCoreConfig::default(), fixed_wcs("GLON-CAR", "GLAT-CAR"));
        let err = stage
            .process(bundle(Fields::new(), fields(&["s_dec"])))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadAxes);
    }

    #[test]
    fn test_existing_coordinates_are_kept() {
        let aliased = Fields::from([
            ("s_ra".to_string(), Value::Float(1.0)),
            ("s_dec".to_string(), Value::Float(2.0)),
        ]);
        let mut stage = ObsCoreCalculator::new(ObsCoreConfig::default(), fixed_wcs("GLON-CAR", "GLAT-CAR"));
        let calculated = stage
            .process(bundle(aliased, fields(&["s_ra", "s_dec"])))
            .unwrap()
            .calculated
            .unwrap();
        assert_eq!(calculated["s_ra"], Value::Float(1.0));
    }

    #[test]
    fn test_unknown_bitpix_and_target() {
        let mut input = bundle(Fields::new(), fields(&["im_pixtype", "target_name", "instrument_name"]));
        if let Some(headers) = input.headers.as_mut() {
            headers.insert("BITPIX", 24i64);
        }
        input.file_info = Some(FileInfo::local(Path::new("uds_f200w.fits"), 2880, None));

        let calculated = calculator(ObsCoreConfig::default())
            .process(input)
            .unwrap()
            .calculated
            .unwrap();
        assert_eq!(calculated["im_pixtype"], Value::Text("UNKNOWN".into()));
        assert_eq!(calculated["target_name"], Value::Text("UNKNOWN".into()));
        assert_eq!(calculated["instrument_name"], Value::Text("NIRCam".into()));
    }

    #[test]
    fn test_defaults_fill_absent_fields_and_coerce() {
        let mut fields_info = fields(&["dataproduct_type", "s_resolution", "t_min"]);
        if let Some(spec) = fields_info.get_mut("t_min") {
            spec.datatype = Some("date".into());
        }
        let mut input = bundle(
            Fields::from([("t_min".to_string(), Value::Text("2022-12-01T10:00:00.5".into()))]),
            fields_info,
        );
        input.defaults = Some(Fields::from([
            ("dataproduct_type".to_string(), Value::Text("image".into())),
            ("s_resolution".to_string(), Value::Float(0.1)),
        ]));

        let calculated = calculator(ObsCoreConfig::default())
            .process(input)
            .unwrap()
            .calculated
            .unwrap();
        assert_eq!(calculated["dataproduct_type"], Value::Text("image".into()));
        assert_eq!(calculated["s_resolution"], Value::Float(0.1));
        assert!(matches!(calculated["t_min"], Value::Timestamp(_)));
    }

    #[test]
    fn test_with_linear_tan_solver() {
        let mut headers = Header::new();
        for (k, v) in [("NAXIS1", 512i64), ("NAXIS2", 512), ("BITPIX", 16)] {
            headers.insert(k, v);
        }
        headers.insert("CTYPE1", "RA---TAN");
        headers.insert("CTYPE2", "DEC--TAN");
        headers.insert("CRVAL1", 250.4226);
        headers.insert("CRVAL2", 36.4602);
        headers.insert("CRPIX1", 256.5);
        headers.insert("CRPIX2", 256.5);
        headers.insert("CDELT1", -1.0e-4);
        headers.insert("CDELT2", 1.0e-4);

        let input = MetadataBundle {
            headers: Some(headers),
            fields_info: Some(fields(&["s_ra", "s_dec", "im_pixtype"])),
            ..MetadataBundle::default()
        };
        let calculated = ObsCoreCalculator::new(ObsCoreConfig::default(), Box::new(LinearTanSolver))
            .process(input)
            .unwrap()
            .calculated
            .unwrap();
        assert_eq!(calculated["s_ra"], Value::Float(250.4226));
        assert_eq!(calculated["s_dec"], Value::Float(36.4602));
        assert_eq!(calculated["im_pixtype"], Value::Text("short".into()));
        let scale = calculated["im_scale"].as_f64().unwrap();
        assert!((scale - 1.0e-4).abs() < 1e-12);
    }

    #[test]
    fn test_filter_lookup() {
        assert_eq!(filter_resolution("F070W"), Some(0.030));
        assert_eq!(filter_resolution(" f480m "), Some(0.157));
        assert_eq!(filter_resolution("CLEAR"), None);
    }
}
