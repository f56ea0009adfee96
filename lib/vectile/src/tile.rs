//! The top-level tile builder.

use bytes::Bytes;
use protobuf::CodedOutputStream;
use tracing::debug;

use crate::error::EncodeError;
use crate::layer::LayerBuilder;
use crate::types::{tile_fields, TileLocator};
use crate::view::LayerView;

// Per-layer allowance for the record tag and length prefix when sizing the
// output buffer.
const LAYER_RECORD_OVERHEAD: usize = 8;

/// Handle to a fresh layer registered with a [`TileBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerId(usize);

#[derive(Debug)]
enum LayerSlot {
    Fresh(LayerBuilder),
    Existing(Bytes),
}

impl LayerSlot {
    fn estimated_size(&self) -> usize {
        match self {
            Self::Fresh(layer) => layer.estimated_size() + LAYER_RECORD_OVERHEAD,
            Self::Existing(data) => data.len() + LAYER_RECORD_OVERHEAD,
        }
    }
}

/// Assembles a vector tile from fresh and pre-encoded layers.
///
/// Layers are emitted in registration order. Serialization is the single
/// terminal operation; abandoning a partially built tile is just dropping
/// the builder.
#[derive(Debug, Default)]
pub struct TileBuilder {
    layers: Vec<LayerSlot>,
}

impl TileBuilder {
    /// Creates an empty tile builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh layer and returns a handle to it.
    ///
    /// Panics unless `version` is 1, 2 or 3.
    pub fn add_layer(&mut self, name: &str, version: u32, extent: u32) -> LayerId {
        self.push_fresh(LayerBuilder::new(name, version, extent, None))
    }

    /// Registers a fresh version 3 layer carrying its position in the tile
    /// pyramid. The extent is taken from the locator.
    pub fn add_layer_tiled(&mut self, name: &str, version: u32, locator: TileLocator) -> LayerId {
        assert!(version == 3, "tile locators require a version 3 layer");
        self.push_fresh(LayerBuilder::new(name, version, locator.extent, Some(locator)))
    }

    /// Registers a fresh layer mirroring a decoded layer's header; version 3
    /// layers also take over the decoded value tables and scalings so copied
    /// features keep their attribute references valid.
    pub fn add_layer_from(&mut self, view: &LayerView<'_>) -> LayerId {
        self.push_fresh(LayerBuilder::from_view(view))
    }

    /// Appends an already-encoded layer message to be spliced into the
    /// output verbatim. The bytes are treated as opaque and are not
    /// validated.
    pub fn add_existing_layer(&mut self, data: Bytes) {
        self.layers.push(LayerSlot::Existing(data));
    }

    /// Mutable access to a registered fresh layer.
    pub fn layer_mut(&mut self, id: LayerId) -> &mut LayerBuilder {
        match &mut self.layers[id.0] {
            LayerSlot::Fresh(layer) => layer,
            LayerSlot::Existing(_) => panic!("existing layers cannot be modified"),
        }
    }

    /// Rough size of the serialized tile, used to reserve output capacity.
    pub fn estimated_size(&self) -> usize {
        self.layers.iter().map(LayerSlot::estimated_size).sum()
    }

    /// Serializes the tile: every pre-encoded layer verbatim, every fresh
    /// layer that committed at least one feature, all in registration order.
    pub fn serialize(self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(self.estimated_size());
        let mut os = CodedOutputStream::vec(&mut out);
        for slot in &self.layers {
            match slot {
                LayerSlot::Fresh(layer) => layer.build(&mut os)?,
                LayerSlot::Existing(data) => os.write_bytes(tile_fields::LAYERS, data)?,
            }
        }
        os.flush()?;
        drop(os);

        debug!(layers = self.layers.len(), bytes = out.len(), "serialized tile");
        Ok(out)
    }

    fn push_fresh(&mut self, layer: LayerBuilder) -> LayerId {
        self.layers.push(LayerSlot::Fresh(layer));
        LayerId(self.layers.len() - 1)
    }
}
