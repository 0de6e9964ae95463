//! Complementary-color (cyan / yellow / magenta) mosaics.
//!
//! Each 2x2 cell holds one cyan, one magenta and two yellow samples. With
//! `Cy = G + B`, `Ye = R + G` and `Mg = R + B` the primaries of a cell are
//!
//! ```text
//! R = (Ye + Mg - Cy) / 2
//! G = (Ye + Cy - Mg) / 2
//! B = (Cy + Mg - Ye) / 2
//! ```
//!
//! The half-resolution result is bilinearly upsampled back to full size.
//!
//! Several cameras declare the CYYM code while the sensor uses another
//! arrangement of the same family. [`CfaRemapTable`] corrects that from the
//! camera identity stored in the header.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::debayer::{for_each_row, to_u8};
use crate::consts::RGB_CHANNELS;
use crate::error::{Result, SerError};
use crate::frame::ColorFormat;
use crate::io::ser::FileMetadata;

/// Position of each complementary color inside the 2x2 cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellLayout {
    cyan: (usize, usize),
    magenta: (usize, usize),
    yellow: [(usize, usize); 2],
}

fn layout(format: ColorFormat) -> Option<CellLayout> {
    let l = match format {
        // Cy Ye / Ye Mg
        ColorFormat::BayerCYYM => CellLayout {
            cyan: (0, 0),
            magenta: (1, 1),
            yellow: [(0, 1), (1, 0)],
        },
        // Ye Cy / Mg Ye
        ColorFormat::BayerYCMY => CellLayout {
            cyan: (0, 1),
            magenta: (1, 0),
            yellow: [(0, 0), (1, 1)],
        },
        // Ye Mg / Cy Ye
        ColorFormat::BayerYMCY => CellLayout {
            cyan: (1, 0),
            magenta: (0, 1),
            yellow: [(0, 0), (1, 1)],
        },
        // Mg Ye / Ye Cy
        ColorFormat::BayerMYYC => CellLayout {
            cyan: (1, 1),
            magenta: (0, 0),
            yellow: [(0, 1), (1, 0)],
        },
        _ => return None,
    };
    Some(l)
}

/// Demosaic a complementary mosaic. `raw` holds 0..=255 samples.
///
/// Returns `None` if `format` is not a CYYM-family layout.
pub fn demosaic_cmy(raw: &Array2<f32>, format: ColorFormat) -> Option<Array3<u8>> {
    let layout = layout(format)?;
    let (h, w) = raw.dim();
    let ch = h.div_ceil(2);
    let cw = w.div_ceil(2);

    // Per-cell primaries at half resolution.
    let mut cells = Array3::<f32>::zeros((ch, cw, RGB_CHANNELS));
    let sample = |cell_row: usize, cell_col: usize, (dr, dc): (usize, usize)| -> f32 {
        let r = (cell_row * 2 + dr).min(h - 1);
        let c = (cell_col * 2 + dc).min(w - 1);
        raw[[r, c]]
    };
    for cr in 0..ch {
        for cc in 0..cw {
            let cy = sample(cr, cc, layout.cyan);
            let mg = sample(cr, cc, layout.magenta);
            let ye = (sample(cr, cc, layout.yellow[0]) + sample(cr, cc, layout.yellow[1])) * 0.5;
            cells[[cr, cc, 0]] = ((ye + mg - cy) * 0.5).clamp(0.0, 255.0);
            cells[[cr, cc, 1]] = ((ye + cy - mg) * 0.5).clamp(0.0, 255.0);
            cells[[cr, cc, 2]] = ((cy + mg - ye) * 0.5).clamp(0.0, 255.0);
        }
    }

    let mut out = Array3::<u8>::zeros((h, w, RGB_CHANNELS));
    for_each_row(&mut out, |row, mut line| {
        let (y0, y1, fy) = cell_coord(row, ch);
        for col in 0..w {
            let (x0, x1, fx) = cell_coord(col, cw);
            for c in 0..RGB_CHANNELS {
                let top = cells[[y0, x0, c]] * (1.0 - fx) + cells[[y0, x1, c]] * fx;
                let bottom = cells[[y1, x0, c]] * (1.0 - fx) + cells[[y1, x1, c]] * fx;
                line[[col, c]] = to_u8(top * (1.0 - fy) + bottom * fy);
            }
        }
    });
    Some(out)
}

/// Map a full-resolution coordinate onto the cell grid: `(lower, upper, frac)`.
///
/// Cell `i` is centred at pixel coordinate `2i + 0.5`.
#[inline]
fn cell_coord(pos: usize, cells: usize) -> (usize, usize, f32) {
    let max = (cells - 1) as f32;
    let t = ((pos as f32 - 0.5) * 0.5).clamp(0.0, max);
    let lower = t.floor() as usize;
    let upper = (lower + 1).min(cells - 1);
    (lower, upper, t - lower as f32)
}

/// One camera-to-pattern rule. Every field that is set must match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfaRemapRule {
    /// Camera / source id from the header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lu_id: Option<i32>,
    /// Instrument name. Matched exactly first, then as a case-insensitive substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    /// Actual sensor arrangement (a CYYM-family format).
    pub pattern: ColorFormat,
}

/// Lookup from camera identity to the real complementary-mosaic arrangement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CfaRemapTable {
    rules: Vec<CfaRemapRule>,
}

impl Default for CfaRemapTable {
    fn default() -> Self {
        let ycmy = |name: &str| CfaRemapRule {
            lu_id: None,
            instrument: Some(name.to_string()),
            pattern: ColorFormat::BayerYCMY,
        };
        Self {
            rules: vec![
                ycmy("ZWO ASI183MC"),
                ycmy("ZWO ASI183MM"),
                ycmy("ZWO ASI294MC"),
                ycmy("ZWO ASI533MC"),
                ycmy("ZWO ASI678MC"),
            ],
        }
    }
}

impl CfaRemapTable {
    pub fn new(rules: Vec<CfaRemapRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[CfaRemapRule] {
        &self.rules
    }

    /// Reject rules that can never match or that target a non-CYYM format.
    pub fn validate(&self) -> Result<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.lu_id.is_none() && rule.instrument.is_none() {
                return Err(SerError::Config(format!(
                    "cfa_remap rule {i} has neither lu_id nor instrument"
                )));
            }
            if !rule.pattern.is_cmy() {
                return Err(SerError::Config(format!(
                    "cfa_remap rule {i} targets {}, expected a CYYM-family pattern",
                    rule.pattern
                )));
            }
        }
        Ok(())
    }

    /// Format to decode with. Only CYYM-family declarations are remapped;
    /// unmatched cameras keep the declared format.
    pub fn resolve(&self, metadata: &FileMetadata) -> ColorFormat {
        let declared = metadata.color_format;
        if !declared.is_cmy() {
            return declared;
        }
        let exact = self
            .rules
            .iter()
            .find(|rule| rule.matches(metadata, |name, inst| name == inst));
        let fuzzy = || {
            self.rules.iter().find(|rule| {
                rule.matches(metadata, |name, inst| {
                    inst.to_uppercase().contains(&name.to_uppercase())
                })
            })
        };
        match exact.or_else(fuzzy) {
            Some(rule) => {
                debug!(
                    declared = %declared,
                    resolved = %rule.pattern,
                    instrument = %metadata.instrument,
                    "Remapped complementary mosaic"
                );
                rule.pattern
            }
            None => declared,
        }
    }
}

impl CfaRemapRule {
    fn matches(&self, metadata: &FileMetadata, name_match: impl Fn(&str, &str) -> bool) -> bool {
        let id_ok = self.lu_id.map_or(true, |id| id == metadata.lu_id);
        let name_ok = match &self.instrument {
            Some(name) => !metadata.instrument.is_empty() && name_match(name, &metadata.instrument),
            None => true,
        };
        (self.lu_id.is_some() || self.instrument.is_some()) && id_ok && name_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_coord_edges_clamp() {
        assert_eq!(cell_coord(0, 4), (0, 1, 0.0));
        let (lo, hi, f) = cell_coord(7, 4);
        assert_eq!((lo, hi), (3, 3));
        assert!(f.abs() < 1e-6);
    }

    #[test]
    fn cell_coord_interpolates_between_centres() {
        let (lo, hi, f) = cell_coord(2, 4);
        assert_eq!((lo, hi), (0, 1));
        assert!((f - 0.75).abs() < 1e-6);
    }

    #[test]
    fn layouts_cover_the_family() {
        for format in ColorFormat::ALL {
            assert_eq!(layout(format).is_some(), format.is_cmy());
        }
    }
}
