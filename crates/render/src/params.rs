//! Page layout parameters accepted by the generator.

use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace(['-', '_', ' '], "")
}

/// Unit of an explicit page width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DimensionUnit {
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "mm"))]
    Millimeter,
    #[cfg_attr(feature = "serde", serde(alias = "cm"))]
    Centimeter,
    #[cfg_attr(feature = "serde", serde(alias = "in"))]
    Inch,
    #[cfg_attr(feature = "serde", serde(alias = "px"))]
    Pixel,
}
impl DimensionUnit {
    /// Suffix the renderer expects after a dimension (`"mm"`, `"cm"`, `"in"`, `"px"`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Millimeter => "mm",
            Self::Centimeter => "cm",
            Self::Inch => "in",
            Self::Pixel => "px",
        }
    }
}
impl FromStr for DimensionUnit {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => Self::Millimeter,
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => Self::Centimeter,
            "in" | "inch" | "inches" => Self::Inch,
            "px" | "pixel" | "pixels" => Self::Pixel,
            _ => exn::bail!(ErrorKind::InvalidParameter { field: "dimension unit", value: s.to_string() }),
        })
    }
}
impl Display for DimensionUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.suffix())
    }
}

/// Named paper formats understood by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PageFormat {
    #[cfg_attr(feature = "serde", serde(alias = "a3"))]
    A3,
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "a4"))]
    A4,
    #[cfg_attr(feature = "serde", serde(alias = "a5"))]
    A5,
    #[cfg_attr(feature = "serde", serde(alias = "legal"))]
    Legal,
    #[cfg_attr(feature = "serde", serde(alias = "letter"))]
    Letter,
    #[cfg_attr(feature = "serde", serde(alias = "tabloid"))]
    Tabloid,
}
impl PageFormat {
    /// The format name exactly as the renderer expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::Legal => "Legal",
            Self::Letter => "Letter",
            Self::Tabloid => "Tabloid",
        }
    }
}
impl FromStr for PageFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "a3" => Self::A3,
            "a4" => Self::A4,
            "a5" => Self::A5,
            "legal" => Self::Legal,
            "letter" => Self::Letter,
            "tabloid" => Self::Tabloid,
            _ => exn::bail!(ErrorKind::InvalidParameter { field: "page format", value: s.to_string() }),
        })
    }
}
impl Display for PageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}
impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}
impl FromStr for Orientation {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "portrait" | "p" => Self::Portrait,
            "landscape" | "l" => Self::Landscape,
            _ => exn::bail!(ErrorKind::InvalidParameter { field: "orientation", value: s.to_string() }),
        })
    }
}
impl Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// How the rendered page should be laid out.
///
/// Explicit dimensions win over [`format`](Self::format), but only when both
/// [`page_width`](Self::page_width) and [`page_height`](Self::page_height)
/// are non-zero.
///
/// # Example
///
/// ```
/// use rasterpdf_render::{DimensionUnit, GenerationParameters};
///
/// let params = GenerationParameters::default().with_size(200, 300, DimensionUnit::Millimeter);
/// assert_eq!(params.layout(), "200mm*300mm");
/// assert_eq!(GenerationParameters::default().layout(), "A4");
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GenerationParameters {
    #[cfg_attr(feature = "serde", serde(alias = "width"))]
    pub page_width: u32,
    #[cfg_attr(feature = "serde", serde(alias = "height"))]
    pub page_height: u32,
    #[cfg_attr(feature = "serde", serde(alias = "unit"))]
    pub dimension_unit: DimensionUnit,
    pub format: PageFormat,
    pub orientation: Orientation,
    /// Scaling factor, where `1.0` is 100%.
    #[cfg_attr(feature = "serde", serde(alias = "zoom"))]
    pub zoom_factor: f64,
}
impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            page_width: 0,
            page_height: 0,
            dimension_unit: DimensionUnit::default(),
            format: PageFormat::default(),
            orientation: Orientation::default(),
            zoom_factor: 1.0,
        }
    }
}
impl GenerationParameters {
    pub fn with_size(mut self, width: u32, height: u32, unit: DimensionUnit) -> Self {
        self.page_width = width;
        self.page_height = height;
        self.dimension_unit = unit;
        self
    }

    pub fn with_format(mut self, format: PageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_zoom(mut self, zoom_factor: f64) -> Self {
        self.zoom_factor = zoom_factor;
        self
    }

    /// Reject values the renderer cannot use: the zoom factor must be a
    /// finite number above zero.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.zoom_factor.is_finite() || self.zoom_factor <= 0.0 {
            exn::bail!(ErrorKind::InvalidParameter { field: "zoom factor", value: self.zoom_factor.to_string() });
        }
        Ok(())
    }
}
