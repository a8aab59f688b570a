//! World coordinate solutions for image headers
//!
//! [`LinearTanSolver`] evaluates the linear transformation given by
//! `CRPIXn`/`CRVALn` and either the `CDi_j` matrix or `CDELTn` with
//! `PCi_j`, followed by the gnomonic (`-TAN`) deprojection. Axes without a
//! recognised projection are treated as plain linear offsets.

use super::header::Header;
use crate::error::{Result, ValidationError};
use std::f64::consts::PI;
use std::fmt::Debug;

/// Values derived from an image's world coordinate system
#[derive(Debug, Clone, PartialEq)]
pub struct WcsInfo {
    /// Reference values of axis 1 and 2, in degrees
    pub crval: [f64; 2],
    pub ctype: [String; 2],
    /// Footprint corners as (RA, DEC): lower-left, upper-left, upper-right, lower-right
    pub corners: [(f64, f64); 4],
    /// Pixel scale along each axis, in degrees per pixel
    pub pixel_scale: [f64; 2],
}

impl WcsInfo {
    /// Which reference value is RA and which is DEC
    ///
    /// Axis types starting with `RA` or `DEC` are matched; anything else is
    /// reported as bad-axes.
    pub fn ra_dec(&self) -> Result<(f64, f64)> {
        match (axis_kind(&self.ctype[0]), axis_kind(&self.ctype[1])) {
            (AxisKind::Ra, AxisKind::Dec) => Ok((self.crval[0], self.crval[1])),
            (AxisKind::Dec, AxisKind::Ra) => Ok((self.crval[1], self.crval[0])),
            _ => Err(ValidationError::bad_axes(&self.ctype[0], &self.ctype[1]).into()),
        }
    }

    /// Minimum and maximum RA and DEC over the footprint
    pub fn bounds(&self) -> ((f64, f64), (f64, f64)) {
        let mut ra = (f64::INFINITY, f64::NEG_INFINITY);
        let mut dec = (f64::INFINITY, f64::NEG_INFINITY);
        for (r, d) in self.corners {
            ra = (ra.0.min(r), ra.1.max(r));
            dec = (dec.0.min(d), dec.1.max(d));
        }
        (ra, dec)
    }
}

/// Computes a [`WcsInfo`] from an image header
pub trait WcsSolver: Debug + Send {
    fn solve(&self, header: &Header) -> Result<WcsInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisKind {
    Ra,
    Dec,
    Other,
}

fn axis_kind(ctype: &str) -> AxisKind {
    let upper = ctype.trim().to_ascii_uppercase();
    if upper.starts_with("RA") {
        AxisKind::Ra
    } else if upper.starts_with("DEC") {
        AxisKind::Dec
    } else {
        AxisKind::Other
    }
}

fn is_latitude(ctype: &str) -> bool {
    let upper = ctype.trim().to_ascii_uppercase();
    upper.starts_with("DEC") || upper.starts_with("GLAT") || upper.starts_with("ELAT")
}

fn is_tan(ctype: &str) -> bool {
    ctype.trim().to_ascii_uppercase().ends_with("-TAN")
}

/// Linear pixel transformation with optional TAN projection
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTanSolver;

impl LinearTanSolver {
    fn cd_matrix(header: &Header) -> [[f64; 2]; 2] {
        let has_cd = ["CD1_1", "CD1_2", "CD2_1", "CD2_2"]
            .iter()
            .any(|k| header.contains(k));
        if has_cd {
            let cd = |k: &str| header.get_float(k).unwrap_or(0.0);
            return [[cd("CD1_1"), cd("CD1_2")], [cd("CD2_1"), cd("CD2_2")]];
        }

        let cdelt1 = header.get_float("CDELT1").unwrap_or(1.0);
        let cdelt2 = header.get_float("CDELT2").unwrap_or(1.0);
        let pc = |k: &str, default: f64| header.get_float(k).unwrap_or(default);
        [
            [cdelt1 * pc("PC1_1", 1.0), cdelt1 * pc("PC1_2", 0.0)],
            [cdelt2 * pc("PC2_1", 0.0), cdelt2 * pc("PC2_2", 1.0)],
        ]
    }
}

impl WcsSolver for LinearTanSolver {
    fn solve(&self, header: &Header) -> Result<WcsInfo> {
        let naxis1 = header
            .get_float("NAXIS1")
            .ok_or_else(|| ValidationError::bad_value("image header has no NAXIS1"))?;
        let naxis2 = header
            .get_float("NAXIS2")
            .ok_or_else(|| ValidationError::bad_value("image header has no NAXIS2"))?;

        let crpix = [
            header.get_float("CRPIX1").unwrap_or(0.0),
            header.get_float("CRPIX2").unwrap_or(0.0),
        ];
        let crval = [
            header.get_float("CRVAL1").unwrap_or(0.0),
            header.get_float("CRVAL2").unwrap_or(0.0),
        ];
        let ctype = [
            header.get_str("CTYPE1").unwrap_or("").to_string(),
            header.get_str("CTYPE2").unwrap_or("").to_string(),
        ];
        let cd = Self::cd_matrix(header);

        let transform = Transform {
            crpix,
            crval,
            cd,
            swapped: is_latitude(&ctype[0]),
            tan: is_tan(&ctype[0]) && is_tan(&ctype[1]),
        };

        let corners = [
            transform.pixel_to_world(1.0, 1.0),
            transform.pixel_to_world(1.0, naxis2),
            transform.pixel_to_world(naxis1, naxis2),
            transform.pixel_to_world(naxis1, 1.0),
        ];

        let pixel_scale = [
            (cd[0][0].powi(2) + cd[1][0].powi(2)).sqrt(),
            (cd[0][1].powi(2) + cd[1][1].powi(2)).sqrt(),
        ];

        Ok(WcsInfo {
            crval,
            ctype,
            corners,
            pixel_scale,
        })
    }
}

struct Transform {
    crpix: [f64; 2],
    crval: [f64; 2],
    cd: [[f64; 2]; 2],
    /// Axis 1 is latitude
    swapped: bool,
    tan: bool,
}

impl Transform {
    /// 1-based pixel coordinates to (longitude, latitude) in degrees
    fn pixel_to_world(&self, p1: f64, p2: f64) -> (f64, f64) {
        let dx = p1 - self.crpix[0];
        let dy = p2 - self.crpix[1];
        let x1 = self.cd[0][0] * dx + self.cd[0][1] * dy;
        let x2 = self.cd[1][0] * dx + self.cd[1][1] * dy;

        let (x, y, lon0, lat0) = if self.swapped {
            (x2, x1, self.crval[1], self.crval[0])
        } else {
            (x1, x2, self.crval[0], self.crval[1])
        };

        if !self.tan {
            return (lon0 + x, lat0 + y);
        }

        let (lon, lat) = deproject_tan(x, y, lon0, lat0);
        (lon.rem_euclid(360.0), lat)
    }
}

/// Gnomonic projection plane offsets (degrees) to celestial coordinates
fn deproject_tan(x: f64, y: f64, lon0: f64, lat0: f64) -> (f64, f64) {
    let r = x.hypot(y);
    let phi = if r == 0.0 { 0.0 } else { x.atan2(-y) };
    let theta = if r == 0.0 {
        PI / 2.0
    } else {
        (180.0 / PI / r).atan()
    };

    let delta_p = lat0.to_radians();
    let phi_p = PI;
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_dp, cos_dp) = delta_p.sin_cos();
    let dphi = phi - phi_p;

    let lon = lon0.to_radians()
        + (-cos_theta * dphi.sin()).atan2(sin_theta * cos_dp - cos_theta * sin_dp * dphi.cos());
    let lat = (sin_theta * sin_dp + cos_theta * cos_dp * dphi.cos()).asin();

    (lon.to_degrees(), lat.to_degrees())
}

/// Solver returning a precomputed solution regardless of the header
#[derive(Debug, Clone)]
pub struct FixedWcs(pub WcsInfo);

impl WcsSolver for FixedWcs {
    fn solve(&self, _header: &Header) -> Result<WcsInfo> {
        Ok(self.0.clone())
    }
}
