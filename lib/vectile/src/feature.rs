//! Per-feature builders: a small state machine over the parent layer buffer.
//!
//! A feature builder exclusively borrows its layer for its whole life, which
//! also guarantees a layer never has two features in flight. Ids stream into
//! the layer buffer immediately; geometry commands and attributes accumulate
//! in scratch and are written out at [`commit`](FeatureBuilder::commit),
//! after which the feature record header is spliced in front of the body.
//! Dropping a builder without committing truncates the layer buffer back to
//! where construction found it.

use std::marker::PhantomData;

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::{GeometryError, TooFewPointsSnafu, TooManyPointsSnafu};
use crate::layer::LayerBuilder;
use crate::types::{feature_fields, layer_fields, GeomType, Point};
use crate::value::PropertyValue;
use crate::view::FeatureView;
use crate::wire::{
    delta_encode, put_len_field, put_packed_s64, put_packed_u32, put_str_field, put_varint,
    put_varint_field, splice_len_header, zigzag32, zigzag64,
};

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

// Command counts are stored in the upper 29 bits of a command integer.
const MAX_COMMAND_COUNT: u64 = 1 << 29;

fn command_integer(command: u32, count: u32) -> u32 {
    (command & 0x7) | (count << 3)
}

// Structured attribute stream (version 3): each complex value is a varint
// with the type in the low 4 bits and a parameter above.
const CV_STRING: u64 = 0;
const CV_FLOAT: u64 = 1;
const CV_DOUBLE: u64 = 2;
const CV_UINT_REF: u64 = 3;
const CV_SINT_REF: u64 = 4;
const CV_INLINE_UINT: u64 = 5;
const CV_INLINE_SINT: u64 = 6;
const CV_BOOL_NULL: u64 = 7;
const CV_NUMBER_LIST: u64 = 10;

// Integers above this go through the int_values table instead of inline.
const CV_INLINE_LIMIT: u64 = 1 << 56;

fn complex_value(ty: u64, param: u64) -> u64 {
    ty | (param << 4)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Init,
    IdSet,
    GeomSet,
    AttrsSet,
    Done,
}

mod sealed {
    pub trait Sealed {}
}

/// Marker for the geometry policy of a [`FeatureBuilder`].
pub trait Shape: sealed::Sealed {}

/// Policy marker for point features.
#[derive(Debug)]
pub struct PointShape;

/// Policy marker for linestring features.
#[derive(Debug)]
pub struct LineShape;

/// Policy marker for polygon features.
#[derive(Debug)]
pub struct PolygonShape;

/// Policy marker for the generic builder that accepts raw geometry of any
/// type; used when copying decoded features.
#[derive(Debug)]
pub struct AnyShape;

impl sealed::Sealed for PointShape {}
impl sealed::Sealed for LineShape {}
impl sealed::Sealed for PolygonShape {}
impl sealed::Sealed for AnyShape {}
impl Shape for PointShape {}
impl Shape for LineShape {}
impl Shape for PolygonShape {}
impl Shape for AnyShape {}

/// Builds point features.
pub type PointFeatureBuilder<'a> = FeatureBuilder<'a, PointShape>;
/// Builds linestring features.
pub type LinestringFeatureBuilder<'a> = FeatureBuilder<'a, LineShape>;
/// Builds polygon features.
pub type PolygonFeatureBuilder<'a> = FeatureBuilder<'a, PolygonShape>;

/// A typed attribute value for version 3 features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue<'a> {
    /// UTF-8 string, interned in the layer string table.
    String(&'a str),
    /// 64-bit float, interned in the layer double table.
    Double(f64),
    /// 32-bit float, interned in the layer float table.
    Float(f32),
    /// Unsigned integer; small magnitudes are stored inline.
    Uint(u64),
    /// Signed integer; small magnitudes are stored inline.
    Sint(i64),
    /// Boolean value.
    Bool(bool),
    /// Explicit null.
    Null,
}

/// Builder for a single feature within a layer.
///
/// The `S` parameter selects the geometry policy; use the
/// [`PointFeatureBuilder`], [`LinestringFeatureBuilder`] and
/// [`PolygonFeatureBuilder`] aliases for shaped features, or the default
/// `FeatureBuilder<'_>` for copying decoded features of any type.
///
/// A builder must end in exactly one of [`commit`](Self::commit) or
/// [`rollback`](Self::rollback); dropping it without a commit rolls back.
#[derive(Debug)]
pub struct FeatureBuilder<'a, S: Shape = AnyShape> {
    layer: &'a mut LayerBuilder,
    mark: usize,
    stage: Stage,
    geom_type: GeomType,
    geometry: SmallVec<[u32; 32]>,
    raw_geometry: Vec<u8>,
    cursor: (i32, i32),
    tags: SmallVec<[u32; 16]>,
    attributes: Vec<u8>,
    geometric_attributes: Vec<u8>,
    elevations: Vec<i64>,
    raw_elevations: Vec<u8>,
    _shape: PhantomData<S>,
}

impl<'a, S: Shape> FeatureBuilder<'a, S> {
    /// Starts a new feature on the given layer.
    pub fn new(layer: &'a mut LayerBuilder) -> Self {
        let mark = layer.mark();
        Self {
            layer,
            mark,
            stage: Stage::Init,
            geom_type: GeomType::Unknown,
            geometry: SmallVec::new(),
            raw_geometry: Vec::new(),
            cursor: (0, 0),
            tags: SmallVec::new(),
            attributes: Vec::new(),
            geometric_attributes: Vec::new(),
            elevations: Vec::new(),
            raw_elevations: Vec::new(),
            _shape: PhantomData,
        }
    }

    /// Sets the integer id. Must be the first call on the builder.
    pub fn set_integer_id(&mut self, id: u64) {
        assert!(self.stage == Stage::Init, "feature id must be set before any geometry");
        put_varint_field(self.layer.buf_mut(), feature_fields::ID, id);
        self.stage = Stage::IdSet;
    }

    /// Sets the string id (version 3 layers only). Must be the first call
    /// on the builder.
    pub fn set_string_id(&mut self, id: &str) {
        assert!(self.layer.version() == 3, "string ids require a version 3 layer");
        assert!(self.stage == Stage::Init, "feature id must be set before any geometry");
        put_str_field(self.layer.buf_mut(), feature_fields::STRING_ID, id);
        self.stage = Stage::IdSet;
    }

    /// Adds a tagged property (version 1/2 layers only), interning the key
    /// and value in the layer tables.
    pub fn add_property(&mut self, key: &str, value: &PropertyValue<'_>) {
        self.require_geometry();
        let key_index = self.layer.add_key(key);
        let value_index = self.layer.add_value(value);
        self.tags.push(key_index);
        self.tags.push(value_index);
        self.stage = Stage::AttrsSet;
    }

    /// Adds a tagged property from already-interned table indices
    /// (version 1/2 layers only). Indices are not checked.
    pub fn add_property_indexed(&mut self, key_index: u32, value_index: u32) {
        assert!(self.layer.version() < 3, "tagged values are a version 1/2 layer feature");
        self.require_geometry();
        self.tags.push(key_index);
        self.tags.push(value_index);
        self.stage = Stage::AttrsSet;
    }

    /// Adds a structured attribute (version 3 layers only).
    pub fn add_attribute(&mut self, key: &str, value: AttributeValue<'_>) {
        assert!(self.layer.version() == 3, "structured attributes require a version 3 layer");
        self.require_geometry();
        let key_index = self.layer.add_key(key);
        put_varint(&mut self.attributes, u64::from(key_index));
        let cv = match value {
            AttributeValue::String(s) => {
                complex_value(CV_STRING, u64::from(self.layer.add_string_value(s)))
            }
            AttributeValue::Double(v) => {
                complex_value(CV_DOUBLE, u64::from(self.layer.add_double_value(v)))
            }
            AttributeValue::Float(v) => {
                complex_value(CV_FLOAT, u64::from(self.layer.add_float_value(v)))
            }
            AttributeValue::Uint(v) if v < CV_INLINE_LIMIT => complex_value(CV_INLINE_UINT, v),
            AttributeValue::Uint(v) => {
                complex_value(CV_UINT_REF, u64::from(self.layer.add_int_value(v)))
            }
            AttributeValue::Sint(v) if zigzag64(v) < CV_INLINE_LIMIT => {
                complex_value(CV_INLINE_SINT, zigzag64(v))
            }
            AttributeValue::Sint(v) => {
                complex_value(CV_SINT_REF, u64::from(self.layer.add_int_value(zigzag64(v))))
            }
            AttributeValue::Bool(b) => complex_value(CV_BOOL_NULL, u64::from(b)),
            AttributeValue::Null => complex_value(CV_BOOL_NULL, 2),
        };
        put_varint(&mut self.attributes, cv);
        self.stage = Stage::AttrsSet;
    }

    /// Adds a scaled number list to the geometric attributes (version 3
    /// layers only). Values are delta-encoded against each other.
    pub fn add_geometric_attribute(&mut self, key: &str, scaling: u32, values: &[i64]) {
        assert!(self.layer.version() == 3, "structured attributes require a version 3 layer");
        self.require_geometry();
        debug_assert!(scaling < self.layer.num_attribute_scalings());
        let key_index = self.layer.add_key(key);
        put_varint(&mut self.geometric_attributes, u64::from(key_index));
        put_varint(
            &mut self.geometric_attributes,
            complex_value(CV_NUMBER_LIST, values.len() as u64),
        );
        put_varint(&mut self.geometric_attributes, u64::from(scaling));
        let mut deltas = values.to_vec();
        delta_encode(&mut deltas);
        for delta in deltas {
            // Zero is the null sentinel in number lists, so stored values
            // are shifted up by one.
            put_varint(&mut self.geometric_attributes, zigzag64(delta).wrapping_add(1));
        }
        self.stage = Stage::AttrsSet;
    }

    /// Sets per-point elevations (version 3 layers only). The stream is
    /// delta-encoded and zig-zag packed at commit.
    pub fn set_elevations(&mut self, elevations: &[i64]) {
        assert!(self.layer.version() == 3, "elevations require a version 3 layer");
        self.require_geometry();
        self.elevations = elevations.to_vec();
    }

    /// Finishes the feature: writes the trailing fields, splices the record
    /// header, and counts the feature in the layer. A no-op if the feature
    /// is already finished.
    pub fn commit(&mut self) {
        if self.stage == Stage::Done {
            return;
        }
        assert!(self.stage >= Stage::GeomSet, "committing a feature requires a geometry");
        self.write_trailing();
        splice_len_header(self.layer.buf_mut(), self.mark, layer_fields::FEATURES);
        self.layer.increment_feature_count();
        self.stage = Stage::Done;
    }

    /// Abandons the feature, truncating the layer buffer back to where
    /// construction found it. A no-op if the feature is already finished.
    pub fn rollback(&mut self) {
        if self.stage == Stage::Done {
            return;
        }
        self.layer.truncate_to(self.mark);
        self.stage = Stage::Done;
    }

    fn write_trailing(&mut self) {
        let version = self.layer.version();
        if !self.elevations.is_empty() {
            delta_encode(&mut self.elevations);
        }

        let buf = self.layer.buf_mut();
        put_varint_field(buf, feature_fields::TYPE, self.geom_type.as_u64());
        if self.raw_geometry.is_empty() {
            put_packed_u32(buf, feature_fields::GEOMETRY, &self.geometry);
        } else {
            put_len_field(buf, feature_fields::GEOMETRY, &self.raw_geometry);
        }
        if !self.elevations.is_empty() {
            put_packed_s64(buf, feature_fields::ELEVATIONS, &self.elevations);
        } else if !self.raw_elevations.is_empty() {
            put_len_field(buf, feature_fields::ELEVATIONS, &self.raw_elevations);
        }
        if version < 3 {
            put_packed_u32(buf, feature_fields::TAGS, &self.tags);
        } else {
            if !self.attributes.is_empty() {
                put_len_field(buf, feature_fields::ATTRIBUTES, &self.attributes);
            }
            if !self.geometric_attributes.is_empty() {
                put_len_field(buf, feature_fields::GEOMETRIC_ATTRIBUTES, &self.geometric_attributes);
            }
        }
    }

    fn require_geometry(&self) {
        assert!(
            self.stage == Stage::GeomSet || self.stage == Stage::AttrsSet,
            "feature attributes require a geometry"
        );
    }

    fn start_geometry(&mut self, geom_type: GeomType, allow_more_parts: bool) {
        match self.stage {
            Stage::Init | Stage::IdSet => {
                self.stage = Stage::GeomSet;
                self.geom_type = geom_type;
            }
            Stage::GeomSet if allow_more_parts => {
                debug_assert_eq!(self.geom_type, geom_type);
            }
            Stage::GeomSet => panic!("point geometry can only be added once"),
            _ => panic!("geometry must be added before attributes and commit"),
        }
    }

    fn push_point(&mut self, p: Point) {
        let dx = p.x.wrapping_sub(self.cursor.0);
        let dy = p.y.wrapping_sub(self.cursor.1);
        self.cursor = (p.x, p.y);
        self.geometry.push(zigzag32(dx));
        self.geometry.push(zigzag32(dy));
    }
}

impl<'a> FeatureBuilder<'a, PointShape> {
    /// Adds the single point of a point feature.
    pub fn add_point(&mut self, p: Point) {
        self.start_geometry(GeomType::Point, false);
        self.geometry.push(command_integer(CMD_MOVE_TO, 1));
        self.push_point(p);
    }

    /// Adds a multipoint geometry from a sized sequence of points.
    pub fn add_points<I>(&mut self, points: I) -> Result<(), GeometryError>
    where
        I: IntoIterator<Item = Point>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = points.into_iter();
        let count = iter.len();
        ensure!(count >= 1, TooFewPointsSnafu { needed: 1usize, got: count });
        ensure!((count as u64) < MAX_COMMAND_COUNT, TooManyPointsSnafu { count: count as u64 });
        self.start_geometry(GeomType::Point, false);
        self.geometry.push(command_integer(CMD_MOVE_TO, count as u32));
        for p in iter {
            self.push_point(p);
        }
        Ok(())
    }
}

impl<'a> FeatureBuilder<'a, LineShape> {
    /// Adds one linestring part; call again for multilinestrings.
    pub fn add_linestring(&mut self, points: &[Point]) -> Result<(), GeometryError> {
        ensure!(points.len() >= 2, TooFewPointsSnafu { needed: 2usize, got: points.len() });
        ensure!(
            (points.len() as u64 - 1) < MAX_COMMAND_COUNT,
            TooManyPointsSnafu { count: points.len() as u64 }
        );
        self.start_geometry(GeomType::Linestring, true);
        self.geometry.push(command_integer(CMD_MOVE_TO, 1));
        self.push_point(points[0]);
        self.geometry.push(command_integer(CMD_LINE_TO, (points.len() - 1) as u32));
        for &p in &points[1..] {
            self.push_point(p);
        }
        Ok(())
    }
}

impl<'a> FeatureBuilder<'a, PolygonShape> {
    /// Adds one polygon ring, including the explicit closing point, which
    /// must equal the first. Winding is recorded, not validated. Call again
    /// for further rings.
    pub fn add_ring(&mut self, points: &[Point]) -> Result<(), GeometryError> {
        ensure!(points.len() >= 4, TooFewPointsSnafu { needed: 4usize, got: points.len() });
        ensure!(
            (points.len() as u64 - 2) < MAX_COMMAND_COUNT,
            TooManyPointsSnafu { count: points.len() as u64 }
        );
        if points[0] != points[points.len() - 1] {
            return Err(GeometryError::RingNotClosed);
        }
        self.start_geometry(GeomType::Polygon, true);
        self.geometry.push(command_integer(CMD_MOVE_TO, 1));
        self.push_point(points[0]);
        self.geometry.push(command_integer(CMD_LINE_TO, (points.len() - 2) as u32));
        for &p in &points[1..points.len() - 1] {
            self.push_point(p);
        }
        self.geometry.push(command_integer(CMD_CLOSE_PATH, 1));
        Ok(())
    }
}

impl<'a> FeatureBuilder<'a, AnyShape> {
    /// Sets an already-encoded geometry command stream of any type.
    pub fn set_raw_geometry(&mut self, geom_type: GeomType, data: &[u8]) {
        match self.stage {
            Stage::Init | Stage::IdSet => {
                self.stage = Stage::GeomSet;
                self.geom_type = geom_type;
                self.raw_geometry = data.to_vec();
            }
            _ => panic!("geometry must be added before attributes and commit"),
        }
    }

    /// Copies the id of a decoded feature, if it has one.
    pub fn copy_id(&mut self, feature: &FeatureView<'_>) {
        if let Some(id) = feature.integer_id {
            self.set_integer_id(id);
        } else if let Some(id) = feature.string_id {
            self.set_string_id(id);
        }
    }

    /// Copies the geometry of a decoded feature verbatim, including any
    /// elevation stream.
    pub fn copy_geometry(&mut self, feature: &FeatureView<'_>) {
        self.set_raw_geometry(feature.geom_type, feature.geometry);
        if !feature.elevations.is_empty() {
            self.raw_elevations = feature.elevations.to_vec();
        }
    }

    /// Copies the attributes of a decoded feature.
    ///
    /// Version 1/2 properties are re-interned into this layer's tables;
    /// version 3 streams are spliced verbatim, which requires a layer built
    /// with [`crate::TileBuilder::add_layer_from`] so the table references
    /// stay valid.
    pub fn copy_attributes(&mut self, feature: &FeatureView<'_>) {
        self.require_geometry();
        if self.layer.version() < 3 {
            for (key, value) in &feature.properties {
                let key_index = self.layer.add_key(key);
                let value_index = self.layer.add_value_encoded(value);
                self.tags.push(key_index);
                self.tags.push(value_index);
            }
            if !self.tags.is_empty() {
                self.stage = Stage::AttrsSet;
            }
        } else {
            self.attributes = feature.attributes.to_vec();
            self.geometric_attributes = feature.geometric_attributes.to_vec();
            if !self.attributes.is_empty() || !self.geometric_attributes.is_empty() {
                self.stage = Stage::AttrsSet;
            }
        }
    }
}

impl<S: Shape> Drop for FeatureBuilder<'_, S> {
    fn drop(&mut self) {
        if self.stage != Stage::Done {
            self.layer.truncate_to(self.mark);
        }
    }
}
