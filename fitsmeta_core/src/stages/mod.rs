//! Source and transform stages
//!
//! Sources read FITS files and start a fresh bundle. Transforms add the
//! `aliased`, `fields_info`/`defaults` and `calculated` sections, and the
//! missing-field reporter inspects the result without changing it.

mod aliases;
mod fields_info;
mod missing;
mod obscore;
mod remote;
mod source;

pub use aliases::{AliasTable, CatalogAliasStage, ImageAliasStage};
pub use fields_info::{FieldsInfoStage, load_fields_info};
pub use missing::{MissingFieldReporter, ReportFormat};
pub use obscore::{ObsCoreCalculator, filter_resolution};
pub use remote::RemoteHeaderSource;
pub use source::{CatalogDataSource, CatalogHeaderSource, HduKind, ImageHeaderSource};
