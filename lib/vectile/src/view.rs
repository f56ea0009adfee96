//! Borrowed views of decoded layers and features.
//!
//! Decoding is not this crate's job. These types are the hand-off point: a
//! decoder fills them from an existing tile, and the builders consume them
//! to rebuild layers ([`crate::TileBuilder::add_layer_from`]) or copy
//! features ([`crate::copy_feature`]).

use crate::types::{GeomType, Scaling, TileLocator};

/// A decoded layer header, as needed to rebuild the layer.
///
/// For version 3 layers the typed value tables and scalings must be filled
/// in as well; they keep raw attribute streams spliceable when features are
/// copied over.
#[derive(Debug, Clone, Default)]
pub struct LayerView<'a> {
    /// Layer name.
    pub name: &'a str,
    /// Schema version (1..=3).
    pub version: u32,
    /// Grid resolution.
    pub extent: u32,
    /// Tile locator, if the layer carries one (version 3).
    pub tile: Option<TileLocator>,
    /// Key table, in table order (version 3; ignored for 1/2).
    pub keys: Vec<&'a str>,
    /// String value table, in table order (version 3).
    pub string_values: Vec<&'a str>,
    /// Double value table, in table order (version 3).
    pub double_values: Vec<f64>,
    /// Float value table, in table order (version 3).
    pub float_values: Vec<f32>,
    /// Integer value table, in table order (version 3).
    pub int_values: Vec<u64>,
    /// Attribute scalings, in registration order (version 3).
    pub attribute_scalings: Vec<Scaling>,
    /// Elevation scaling; identity if the layer has none (version 3).
    pub elevation_scaling: Scaling,
}

impl LayerView<'_> {
    /// Returns a registered attribute scaling, or `None` out of range.
    pub fn attribute_scaling(&self, index: u32) -> Option<&Scaling> {
        self.attribute_scalings.get(index as usize)
    }
}

/// A decoded feature, as needed to copy it into another layer.
///
/// The geometry, elevation and attribute fields carry the raw packed
/// payload bytes of the respective feature fields (without tag or length
/// prefix). `properties` holds the decoded key/value pairs of version 1/2
/// features, each value still in its encoded message form.
#[derive(Debug, Clone, Default)]
pub struct FeatureView<'a> {
    /// Integer id, if present. Mutually exclusive with `string_id`.
    pub integer_id: Option<u64>,
    /// String id, if present (version 3).
    pub string_id: Option<&'a str>,
    /// Geometry type.
    pub geom_type: GeomType,
    /// Raw packed geometry command stream.
    pub geometry: &'a [u8],
    /// Raw packed elevation stream (version 3; empty if none).
    pub elevations: &'a [u8],
    /// Raw structured attribute stream (version 3; empty if none).
    pub attributes: &'a [u8],
    /// Raw structured geometric attribute stream (version 3; empty if none).
    pub geometric_attributes: &'a [u8],
    /// Decoded properties of a version 1/2 feature: key text and encoded
    /// value message bytes, in tag order.
    pub properties: Vec<(&'a str, &'a [u8])>,
}
