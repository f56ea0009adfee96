//! Minimal wire reader used by the integration tests.
//!
//! Decoding tiles is not part of the crate; these tests implement just
//! enough of the decoder side to read back what the builders wrote and to
//! fill the view structs the copy helpers consume.

#![allow(dead_code)]

use vectile::{FeatureView, GeomType, LayerView, Scaling, TileLocator};

// Layer message fields.
const L_NAME: u32 = 1;
const L_FEATURES: u32 = 2;
const L_KEYS: u32 = 3;
const L_VALUES: u32 = 4;
const L_EXTENT: u32 = 5;
const L_STRING_VALUES: u32 = 6;
const L_DOUBLE_VALUES: u32 = 7;
const L_FLOAT_VALUES: u32 = 8;
const L_INT_VALUES: u32 = 9;
const L_ELEVATION_SCALING: u32 = 10;
const L_ATTRIBUTE_SCALINGS: u32 = 11;
const L_TILE_X: u32 = 12;
const L_TILE_Y: u32 = 13;
const L_TILE_ZOOM: u32 = 14;
const L_VERSION: u32 = 15;

// Feature message fields.
const F_ID: u32 = 1;
const F_TAGS: u32 = 2;
const F_TYPE: u32 = 3;
const F_GEOMETRY: u32 = 4;
const F_ELEVATIONS: u32 = 5;
const F_ATTRIBUTES: u32 = 8;
const F_GEOMETRIC_ATTRIBUTES: u32 = 9;
const F_STRING_ID: u32 = 10;

/// One decoded field of a protobuf message.
pub enum Field<'a> {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Bytes(&'a [u8]),
}

impl Field<'_> {
    fn varint(&self) -> u64 {
        match self {
            Field::Varint(v) => *v,
            _ => panic!("expected varint field"),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Field::Bytes(b) => b,
            _ => panic!("expected length-delimited field"),
        }
    }
}

/// Field-by-field reader over one protobuf message.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn varint(&mut self) -> u64 {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.data[self.pos];
            self.pos += 1;
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return value;
            }
            shift += 7;
        }
    }

    pub fn next(&mut self) -> Option<(u32, Field<'a>)> {
        if self.pos >= self.data.len() {
            return None;
        }
        let key = self.varint();
        let field = (key >> 3) as u32;
        let value = match key & 0x7 {
            0 => Field::Varint(self.varint()),
            1 => {
                let bytes = &self.data[self.pos..self.pos + 8];
                self.pos += 8;
                Field::Fixed64(u64::from_le_bytes(bytes.try_into().unwrap()))
            }
            2 => {
                let len = self.varint() as usize;
                let bytes = &self.data[self.pos..self.pos + len];
                self.pos += len;
                Field::Bytes(bytes)
            }
            5 => {
                let bytes = &self.data[self.pos..self.pos + 4];
                self.pos += 4;
                Field::Fixed32(u32::from_le_bytes(bytes.try_into().unwrap()))
            }
            wire => panic!("unexpected wire type {wire}"),
        };
        Some((field, value))
    }
}

fn read_packed_varints(data: &[u8]) -> Vec<u64> {
    let mut reader = Reader::new(data);
    let mut values = Vec::new();
    while reader.pos < data.len() {
        values.push(reader.varint());
    }
    values
}

fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// A decoded layer.
#[derive(Debug, Default)]
pub struct Layer {
    pub name: String,
    pub version: u32,
    pub extent: u32,
    pub tile_x: Option<u32>,
    pub tile_y: Option<u32>,
    pub tile_zoom: Option<u32>,
    pub keys: Vec<String>,
    pub values: Vec<Vec<u8>>,
    pub string_values: Vec<String>,
    pub double_values: Vec<f64>,
    pub float_values: Vec<f32>,
    pub int_values: Vec<u64>,
    pub elevation_scaling: Option<Scaling>,
    pub attribute_scalings: Vec<Scaling>,
    pub features: Vec<Feature>,
}

/// A decoded feature.
#[derive(Debug, Default)]
pub struct Feature {
    pub id: Option<u64>,
    pub string_id: Option<String>,
    pub geom_type: u64,
    pub geometry: Vec<u8>,
    pub tags: Vec<u32>,
    pub attributes: Vec<u8>,
    pub geometric_attributes: Vec<u8>,
    pub elevations: Vec<u8>,
}

/// Splits a tile into the raw payload bytes of its layer records.
pub fn layer_payloads(tile: &[u8]) -> Vec<&[u8]> {
    let mut payloads = Vec::new();
    let mut reader = Reader::new(tile);
    while let Some((field, value)) = reader.next() {
        assert_eq!(field, 3, "tile messages only carry layers");
        payloads.push(match value {
            Field::Bytes(b) => b,
            _ => panic!("layer records are length-delimited"),
        });
    }
    payloads
}

/// Decodes a full tile.
pub fn decode_tile(tile: &[u8]) -> Vec<Layer> {
    layer_payloads(tile).into_iter().map(decode_layer).collect()
}

fn decode_layer(data: &[u8]) -> Layer {
    let mut layer = Layer::default();
    let mut reader = Reader::new(data);
    while let Some((field, value)) = reader.next() {
        match field {
            L_NAME => layer.name = String::from_utf8(value.bytes().to_vec()).unwrap(),
            L_FEATURES => layer.features.push(decode_feature(value.bytes())),
            L_KEYS => layer.keys.push(String::from_utf8(value.bytes().to_vec()).unwrap()),
            L_VALUES => layer.values.push(value.bytes().to_vec()),
            L_EXTENT => layer.extent = value.varint() as u32,
            L_STRING_VALUES => {
                layer.string_values.push(String::from_utf8(value.bytes().to_vec()).unwrap())
            }
            L_DOUBLE_VALUES => {
                layer.double_values = value
                    .bytes()
                    .chunks(8)
                    .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                    .collect()
            }
            L_FLOAT_VALUES => {
                layer.float_values = value
                    .bytes()
                    .chunks(4)
                    .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
                    .collect()
            }
            L_INT_VALUES => layer.int_values = read_packed_varints(value.bytes()),
            L_ELEVATION_SCALING => layer.elevation_scaling = Some(decode_scaling(value.bytes())),
            L_ATTRIBUTE_SCALINGS => layer.attribute_scalings.push(decode_scaling(value.bytes())),
            L_TILE_X => layer.tile_x = Some(value.varint() as u32),
            L_TILE_Y => layer.tile_y = Some(value.varint() as u32),
            L_TILE_ZOOM => layer.tile_zoom = Some(value.varint() as u32),
            L_VERSION => layer.version = value.varint() as u32,
            other => panic!("unexpected layer field {other}"),
        }
    }
    layer
}

fn decode_feature(data: &[u8]) -> Feature {
    let mut feature = Feature::default();
    let mut reader = Reader::new(data);
    while let Some((field, value)) = reader.next() {
        match field {
            F_ID => feature.id = Some(value.varint()),
            F_TAGS => {
                feature.tags = read_packed_varints(value.bytes()).iter().map(|&v| v as u32).collect()
            }
            F_TYPE => feature.geom_type = value.varint(),
            F_GEOMETRY => feature.geometry = value.bytes().to_vec(),
            F_ELEVATIONS => feature.elevations = value.bytes().to_vec(),
            F_ATTRIBUTES => feature.attributes = value.bytes().to_vec(),
            F_GEOMETRIC_ATTRIBUTES => feature.geometric_attributes = value.bytes().to_vec(),
            F_STRING_ID => feature.string_id = Some(String::from_utf8(value.bytes().to_vec()).unwrap()),
            other => panic!("unexpected feature field {other}"),
        }
    }
    feature
}

fn decode_scaling(data: &[u8]) -> Scaling {
    let mut scaling = Scaling::default();
    let mut reader = Reader::new(data);
    while let Some((field, value)) = reader.next() {
        match (field, value) {
            (1, Field::Varint(v)) => scaling.offset = zigzag_decode(v),
            (2, Field::Fixed64(v)) => scaling.multiplier = f64::from_bits(v),
            (3, Field::Fixed64(v)) => scaling.base = f64::from_bits(v),
            (other, _) => panic!("unexpected scaling field {other}"),
        }
    }
    scaling
}

/// Builds the layer view the copy helpers consume from a decoded layer.
pub fn layer_view(layer: &Layer) -> LayerView<'_> {
    let tile = match (layer.tile_x, layer.tile_y, layer.tile_zoom) {
        (Some(x), Some(y), Some(zoom)) => {
            Some(TileLocator { x, y, zoom, extent: layer.extent })
        }
        _ => None,
    };
    LayerView {
        name: &layer.name,
        version: layer.version,
        extent: layer.extent,
        tile,
        keys: layer.keys.iter().map(String::as_str).collect(),
        string_values: layer.string_values.iter().map(String::as_str).collect(),
        double_values: layer.double_values.clone(),
        float_values: layer.float_values.clone(),
        int_values: layer.int_values.clone(),
        attribute_scalings: layer.attribute_scalings.clone(),
        elevation_scaling: layer.elevation_scaling.unwrap_or_default(),
    }
}

/// Builds the feature view the copy helpers consume, resolving version 1/2
/// tag pairs against the layer tables.
pub fn feature_view<'a>(layer: &'a Layer, feature: &'a Feature) -> FeatureView<'a> {
    let properties = feature
        .tags
        .chunks(2)
        .map(|pair| {
            (
                layer.keys[pair[0] as usize].as_str(),
                layer.values[pair[1] as usize].as_slice(),
            )
        })
        .collect();
    FeatureView {
        integer_id: feature.id,
        string_id: feature.string_id.as_deref(),
        geom_type: GeomType::from_u64(feature.geom_type),
        geometry: &feature.geometry,
        elevations: &feature.elevations,
        attributes: &feature.attributes,
        geometric_attributes: &feature.geometric_attributes,
        properties,
    }
}
