//! Core types shared across the builder tree, and the wire field numbers.

/// Geometry type of a feature, as encoded in the feature `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum GeomType {
    /// No or unrecognized geometry.
    #[default]
    Unknown = 0,
    /// One or more points.
    Point = 1,
    /// One or more linestrings.
    Linestring = 2,
    /// One or more rings forming polygons.
    Polygon = 3,
    /// Spline geometry (version 3 tiles only).
    Spline = 4,
}

impl GeomType {
    /// Returns the numeric value for encoding in the feature `type` field.
    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// Maps a decoded `type` field value back to a geometry type.
    ///
    /// Unknown values map to [`GeomType::Unknown`].
    pub fn from_u64(value: u64) -> Self {
        match value {
            1 => Self::Point,
            2 => Self::Linestring,
            3 => Self::Polygon,
            4 => Self::Spline,
            _ => Self::Unknown,
        }
    }
}

/// A position on the integer grid of a tile.
///
/// Coordinates are quantized to the layer extent by the caller; the encoder
/// only delta- and zig-zag-encodes whatever it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    /// Grid x coordinate.
    pub x: i32,
    /// Grid y coordinate.
    pub y: i32,
}

impl Point {
    /// Creates a point from grid coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Position of a layer in the tile pyramid (version 3 layers only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLocator {
    /// Tile column.
    pub x: u32,
    /// Tile row.
    pub y: u32,
    /// Zoom level.
    pub zoom: u32,
    /// Grid resolution of the layer.
    pub extent: u32,
}

/// Affine transform applied to a packed numeric attribute stream
/// (version 3 layers only).
///
/// A decoded value is `base + multiplier * (storage + offset)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    /// Offset added to the stored integer before scaling.
    pub offset: i64,
    /// Multiplier applied to the offset value.
    pub multiplier: f64,
    /// Base added after multiplication.
    pub base: f64,
}

impl Scaling {
    /// Creates a scaling from its three components.
    pub fn new(offset: i64, multiplier: f64, base: f64) -> Self {
        Self { offset, multiplier, base }
    }
}

impl Default for Scaling {
    fn default() -> Self {
        Self { offset: 0, multiplier: 1.0, base: 0.0 }
    }
}

/// Field numbers of the tile message.
pub(crate) mod tile_fields {
    pub const LAYERS: u32 = 3;
}

/// Field numbers of the layer message.
///
/// Fields 6 and up belong to the version 3 dialect.
pub(crate) mod layer_fields {
    pub const NAME: u32 = 1;
    pub const FEATURES: u32 = 2;
    pub const KEYS: u32 = 3;
    pub const VALUES: u32 = 4;
    pub const EXTENT: u32 = 5;
    pub const STRING_VALUES: u32 = 6;
    pub const DOUBLE_VALUES: u32 = 7;
    pub const FLOAT_VALUES: u32 = 8;
    pub const INT_VALUES: u32 = 9;
    pub const ELEVATION_SCALING: u32 = 10;
    pub const ATTRIBUTE_SCALINGS: u32 = 11;
    pub const TILE_X: u32 = 12;
    pub const TILE_Y: u32 = 13;
    pub const TILE_ZOOM: u32 = 14;
    pub const VERSION: u32 = 15;
}

/// Field numbers of the feature message.
pub(crate) mod feature_fields {
    pub const ID: u32 = 1;
    pub const TAGS: u32 = 2;
    pub const TYPE: u32 = 3;
    pub const GEOMETRY: u32 = 4;
    pub const ELEVATIONS: u32 = 5;
    pub const ATTRIBUTES: u32 = 8;
    pub const GEOMETRIC_ATTRIBUTES: u32 = 9;
    pub const STRING_ID: u32 = 10;
}

/// Field numbers of the version 1/2 value message.
pub(crate) mod value_fields {
    pub const STRING: u32 = 1;
    pub const FLOAT: u32 = 2;
    pub const DOUBLE: u32 = 3;
    pub const INT: u32 = 4;
    pub const UINT: u32 = 5;
    pub const SINT: u32 = 6;
    pub const BOOL: u32 = 7;
}

/// Field numbers of the scaling message.
pub(crate) mod scaling_fields {
    pub const OFFSET: u32 = 1;
    pub const MULTIPLIER: u32 = 2;
    pub const BASE: u32 = 3;
}
