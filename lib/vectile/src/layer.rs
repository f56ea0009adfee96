//! The per-layer builder: buffer, interning tables, and version gating.

use protobuf::rt::WireType;
use protobuf::CodedOutputStream;
use tracing::trace;

use crate::error::EncodeError;
use crate::table::ValueTable;
use crate::types::{layer_fields, scaling_fields, tile_fields, Scaling, TileLocator};
use crate::value::PropertyValue;
use crate::view::LayerView;
use crate::wire::{
    put_len_field, put_packed_double, put_packed_float, put_packed_u64, put_str_field, put_tag,
    put_varint_field, varint_len, zigzag64, WIRE_FIXED64,
};

/// Builder for one fresh layer of a tile.
///
/// The layer owns a streaming buffer holding the layer message under
/// construction. The header fields (version, name, extent) are written at
/// construction time, committed features are appended by feature builders,
/// and the interning tables are spliced in when the enclosing tile is
/// serialized. A layer that never commits a feature is dropped from the
/// output entirely.
#[derive(Debug)]
pub struct LayerBuilder {
    data: Vec<u8>,
    keys: ValueTable,
    values: ValueTable,
    string_values: ValueTable,
    double_values: Vec<f64>,
    float_values: Vec<f32>,
    int_values: Vec<u64>,
    attribute_scalings: Vec<Scaling>,
    elevation_scaling: Scaling,
    locator: Option<TileLocator>,
    name: String,
    version: u32,
    extent: u32,
    num_features: u64,
}

impl LayerBuilder {
    pub(crate) fn new(name: &str, version: u32, extent: u32, locator: Option<TileLocator>) -> Self {
        assert!((1..=3).contains(&version), "unsupported layer version {version}");
        debug_assert!(!name.is_empty());

        let mut data = Vec::with_capacity(64);
        put_varint_field(&mut data, layer_fields::VERSION, u64::from(version));
        put_str_field(&mut data, layer_fields::NAME, name);
        put_varint_field(&mut data, layer_fields::EXTENT, u64::from(extent));

        Self {
            data,
            keys: ValueTable::new(layer_fields::KEYS),
            values: ValueTable::new(layer_fields::VALUES),
            string_values: ValueTable::new(layer_fields::STRING_VALUES),
            double_values: Vec::new(),
            float_values: Vec::new(),
            int_values: Vec::new(),
            attribute_scalings: Vec::new(),
            elevation_scaling: Scaling::default(),
            locator,
            name: name.to_owned(),
            version,
            extent,
            num_features: 0,
        }
    }

    /// Rebuilds a layer header from a decoded layer.
    ///
    /// Version 3 layers also take over the source's keys, typed value tables
    /// and scalings, so raw attribute streams copied from the source keep
    /// their table references intact. Version 1/2 layers start with empty
    /// tables and re-intern properties as features are copied.
    pub(crate) fn from_view(view: &LayerView<'_>) -> Self {
        let mut layer = Self::new(view.name, view.version, view.extent, view.tile);
        if view.version == 3 {
            for key in &view.keys {
                layer.keys.add_without_dup_check(key.as_bytes());
            }
            for value in &view.string_values {
                layer.string_values.add_without_dup_check(value.as_bytes());
            }
            layer.double_values = view.double_values.clone();
            layer.float_values = view.float_values.clone();
            layer.int_values = view.int_values.clone();
            layer.attribute_scalings = view.attribute_scalings.clone();
            layer.elevation_scaling = view.elevation_scaling;
        }
        layer
    }

    /// The layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema version of this layer.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The grid resolution of this layer.
    pub fn extent(&self) -> u32 {
        self.extent
    }

    /// Number of committed features so far.
    pub fn num_features(&self) -> u64 {
        self.num_features
    }

    /// Interns an attribute key, returning its table index.
    pub fn add_key(&mut self, key: &str) -> u32 {
        self.keys.add(key.as_bytes())
    }

    /// Appends an attribute key without duplicate detection.
    pub fn add_key_without_dup_check(&mut self, key: &str) -> u32 {
        self.keys.add_without_dup_check(key.as_bytes())
    }

    /// Interns a typed property value (version 1/2 layers only).
    pub fn add_value(&mut self, value: &PropertyValue<'_>) -> u32 {
        self.add_value_encoded(&value.encode())
    }

    /// Appends a typed property value without duplicate detection
    /// (version 1/2 layers only).
    pub fn add_value_without_dup_check(&mut self, value: &PropertyValue<'_>) -> u32 {
        self.add_value_encoded_without_dup_check(&value.encode())
    }

    /// Interns a pre-encoded value message (version 1/2 layers only).
    ///
    /// Deduplication compares the encoded bytes, so distinct encodings of
    /// the same logical number stay distinct.
    pub fn add_value_encoded(&mut self, data: &[u8]) -> u32 {
        self.assert_tagged_values();
        self.values.add(data)
    }

    /// Appends a pre-encoded value message without duplicate detection
    /// (version 1/2 layers only).
    pub fn add_value_encoded_without_dup_check(&mut self, data: &[u8]) -> u32 {
        self.assert_tagged_values();
        self.values.add_without_dup_check(data)
    }

    /// Interns a string value (version 3 layers only).
    pub fn add_string_value(&mut self, value: &str) -> u32 {
        self.assert_typed_tables();
        self.string_values.add(value.as_bytes())
    }

    /// Appends a string value without duplicate detection (version 3 layers
    /// only).
    pub fn add_string_value_without_dup_check(&mut self, value: &str) -> u32 {
        self.assert_typed_tables();
        self.string_values.add_without_dup_check(value.as_bytes())
    }

    /// Interns a double value (version 3 layers only). Equality is bitwise.
    pub fn add_double_value(&mut self, value: f64) -> u32 {
        self.assert_typed_tables();
        if let Some(i) = self.double_values.iter().position(|v| v.to_bits() == value.to_bits()) {
            return i as u32;
        }
        self.double_values.push(value);
        (self.double_values.len() - 1) as u32
    }

    /// Appends a double value without duplicate detection (version 3 layers
    /// only).
    pub fn add_double_value_without_dup_check(&mut self, value: f64) -> u32 {
        self.assert_typed_tables();
        self.double_values.push(value);
        (self.double_values.len() - 1) as u32
    }

    /// Interns a float value (version 3 layers only). Equality is bitwise.
    pub fn add_float_value(&mut self, value: f32) -> u32 {
        self.assert_typed_tables();
        if let Some(i) = self.float_values.iter().position(|v| v.to_bits() == value.to_bits()) {
            return i as u32;
        }
        self.float_values.push(value);
        (self.float_values.len() - 1) as u32
    }

    /// Appends a float value without duplicate detection (version 3 layers
    /// only).
    pub fn add_float_value_without_dup_check(&mut self, value: f32) -> u32 {
        self.assert_typed_tables();
        self.float_values.push(value);
        (self.float_values.len() - 1) as u32
    }

    /// Interns an integer value (version 3 layers only).
    pub fn add_int_value(&mut self, value: u64) -> u32 {
        self.assert_typed_tables();
        if let Some(i) = self.int_values.iter().position(|v| *v == value) {
            return i as u32;
        }
        self.int_values.push(value);
        (self.int_values.len() - 1) as u32
    }

    /// Appends an integer value without duplicate detection (version 3
    /// layers only).
    pub fn add_int_value_without_dup_check(&mut self, value: u64) -> u32 {
        self.assert_typed_tables();
        self.int_values.push(value);
        (self.int_values.len() - 1) as u32
    }

    /// Registers a scaling for packed numeric attribute streams, returning
    /// its index (version 3 layers only).
    ///
    /// Scalings are not deduplicated; indices are assigned in registration
    /// order.
    pub fn add_attribute_scaling(&mut self, scaling: Scaling) -> u32 {
        self.assert_scalings();
        self.attribute_scalings.push(scaling);
        (self.attribute_scalings.len() - 1) as u32
    }

    /// Number of registered attribute scalings.
    pub fn num_attribute_scalings(&self) -> u32 {
        self.attribute_scalings.len() as u32
    }

    /// Returns a registered attribute scaling, or `None` out of range.
    pub fn attribute_scaling(&self, index: u32) -> Option<&Scaling> {
        self.attribute_scalings.get(index as usize)
    }

    /// Sets the scaling applied to feature elevations (version 3 layers
    /// only).
    pub fn set_elevation_scaling(&mut self, scaling: Scaling) {
        self.assert_scalings();
        self.elevation_scaling = scaling;
    }

    /// The scaling applied to feature elevations. Identity until set.
    pub fn elevation_scaling(&self) -> Scaling {
        self.elevation_scaling
    }

    /// Rough size of the serialized layer, used to reserve output capacity.
    pub fn estimated_size(&self) -> usize {
        const PBF_OVERHEAD: usize = 14;
        self.data.len()
            + self.keys.data().len()
            + self.values.data().len()
            + self.string_values.data().len()
            + self.double_values.len() * 8
            + self.float_values.len() * 4
            + self.int_values.len() * 8
            + self.attribute_scalings.len() * 12
            + PBF_OVERHEAD
    }

    // Buffer access for the feature builder in flight. While a feature is
    // being built the layer buffer may only grow through these hooks.

    pub(crate) fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    pub(crate) fn mark(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn truncate_to(&mut self, mark: usize) {
        self.data.truncate(mark);
    }

    pub(crate) fn increment_feature_count(&mut self) {
        self.num_features += 1;
    }

    /// Emits this layer as one `layers` record, splicing the buffer and the
    /// table streams under a single length prefix without an intermediate
    /// copy. Layers without committed features emit nothing.
    pub(crate) fn build(&self, os: &mut CodedOutputStream<'_>) -> Result<(), EncodeError> {
        if self.num_features == 0 {
            return Ok(());
        }

        let trailer = if self.version < 3 { Vec::new() } else { self.encode_trailer() };

        let mut total = self.data.len() + self.keys.data().len();
        if self.version < 3 {
            total += self.values.data().len();
        } else {
            total += self.string_values.data().len() + trailer.len();
        }

        os.write_tag(tile_fields::LAYERS, WireType::LengthDelimited)?;
        os.write_raw_varint32(total as u32)?;
        os.write_raw_bytes(&self.data)?;
        os.write_raw_bytes(self.keys.data())?;
        if self.version < 3 {
            os.write_raw_bytes(self.values.data())?;
        } else {
            os.write_raw_bytes(self.string_values.data())?;
            os.write_raw_bytes(&trailer)?;
        }

        trace!(
            name = %self.name,
            version = self.version,
            features = self.num_features,
            bytes = total,
            "emitted layer"
        );
        Ok(())
    }

    // Version 3 layer-level fields that are only known at build time: the
    // packed numeric tables, scalings, and the tile locator.
    fn encode_trailer(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            self.double_values.len() * 8
                + self.float_values.len() * 4
                + self.int_values.len() * 8
                + self.attribute_scalings.len() * 12
                + 16,
        );
        put_packed_double(&mut buf, layer_fields::DOUBLE_VALUES, &self.double_values);
        put_packed_float(&mut buf, layer_fields::FLOAT_VALUES, &self.float_values);
        put_packed_u64(&mut buf, layer_fields::INT_VALUES, &self.int_values);
        if self.elevation_scaling != Scaling::default() {
            put_scaling(&mut buf, layer_fields::ELEVATION_SCALING, &self.elevation_scaling);
        }
        for scaling in &self.attribute_scalings {
            put_scaling(&mut buf, layer_fields::ATTRIBUTE_SCALINGS, scaling);
        }
        if let Some(locator) = self.locator {
            put_varint_field(&mut buf, layer_fields::TILE_X, u64::from(locator.x));
            put_varint_field(&mut buf, layer_fields::TILE_Y, u64::from(locator.y));
            put_varint_field(&mut buf, layer_fields::TILE_ZOOM, u64::from(locator.zoom));
        }
        buf
    }

    fn assert_tagged_values(&self) {
        assert!(self.version < 3, "tagged values are a version 1/2 layer feature");
    }

    fn assert_typed_tables(&self) {
        assert!(self.version == 3, "typed value tables require a version 3 layer");
    }

    fn assert_scalings(&self) {
        assert!(self.version == 3, "scalings require a version 3 layer");
    }
}

// Scaling message: offset (sint64), multiplier (double, default 1.0),
// base (double, default 0.0). Defaults are omitted on the wire.
fn put_scaling(buf: &mut Vec<u8>, field: u32, scaling: &Scaling) {
    let mut inner = Vec::with_capacity(2 + varint_len(zigzag64(scaling.offset)) + 18);
    if scaling.offset != 0 {
        put_varint_field(&mut inner, scaling_fields::OFFSET, zigzag64(scaling.offset));
    }
    if scaling.multiplier != 1.0 {
        put_tag(&mut inner, scaling_fields::MULTIPLIER, WIRE_FIXED64);
        inner.extend_from_slice(&scaling.multiplier.to_le_bytes());
    }
    if scaling.base != 0.0 {
        put_tag(&mut inner, scaling_fields::BASE, WIRE_FIXED64);
        inner.extend_from_slice(&scaling.base.to_le_bytes());
    }
    put_len_field(buf, field, &inner);
}
