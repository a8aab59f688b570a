//! FITS file structure: header cards, HDU walking, tables and WCS

pub mod codec;
pub mod header;
pub mod reader;
pub mod table;
pub mod wcs;

pub use codec::{
    BLOCK_SIZE, ColumnFormat, Extension, PixelType, column_width, data_unit_bytes, element_size,
    fits_format_to_sql, is_catalog_header, is_image_header, padded_size,
};
pub use header::{BLACKLIST, CARD_SIZE, Header};
pub use reader::{FitsReader, HduHeader};
pub use wcs::{FixedWcs, LinearTanSolver, WcsInfo, WcsSolver};

/// File extensions recognised as FITS when scanning directories
pub const FITS_EXTENSIONS: [&str; 3] = ["fits", "fit", "fts"];
