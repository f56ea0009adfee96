//! Streaming encoder for Mapbox Vector Tiles.
//!
//! A tile is assembled through a tree of builders: a [`TileBuilder`] owns
//! its layers, each fresh [`LayerBuilder`] owns an append-only buffer plus
//! the per-layer key/value dictionaries, and a feature builder streams one
//! feature at a time into its layer, with commit/rollback by buffer
//! truncation. There is no intermediate object graph; bytes are laid down
//! as the builders are driven, and [`TileBuilder::serialize`] splices the
//! finished pieces together.
//!
//! Layers follow one of the schema versions 1, 2 or 3. Version 3 adds
//! string feature ids, typed value tables, scaled numeric attribute
//! streams, elevations, and the tile locator; the builders gate those
//! behind the layer version at runtime.
//!
//! # Quick start
//!
//! ```
//! use vectile::{Point, PointFeatureBuilder, PropertyValue, TileBuilder};
//!
//! let mut tile = TileBuilder::new();
//! let roads = tile.add_layer("roads", 2, 4096);
//! {
//!     let mut feature = PointFeatureBuilder::new(tile.layer_mut(roads));
//!     feature.set_integer_id(17);
//!     feature.add_point(Point::new(25, 17));
//!     feature.add_property("kind", &PropertyValue::String("primary"));
//!     feature.commit();
//! }
//! let bytes = tile.serialize().unwrap();
//! assert!(!bytes.is_empty());
//! ```
//!
//! Pre-encoded layers can be passed through untouched with
//! [`TileBuilder::add_existing_layer`], and decoded features can be copied
//! into fresh layers with [`copy_feature`].
#![deny(warnings)]
#![deny(missing_docs)]

mod copy;
mod error;
mod feature;
mod layer;
mod table;
mod tile;
mod types;
mod value;
mod view;
mod wire;

pub use self::copy::{add_points_from_container, copy_feature};
pub use self::error::{EncodeError, GeometryError};
pub use self::feature::{
    AnyShape, AttributeValue, FeatureBuilder, LineShape, LinestringFeatureBuilder,
    PointFeatureBuilder, PointShape, PolygonFeatureBuilder, PolygonShape, Shape,
};
pub use self::layer::LayerBuilder;
pub use self::tile::{LayerId, TileBuilder};
pub use self::types::{GeomType, Point, Scaling, TileLocator};
pub use self::value::PropertyValue;
pub use self::view::{FeatureView, LayerView};
