//! Helpers for moving decoded features into builders.

use crate::error::GeometryError;
use crate::feature::{FeatureBuilder, PointFeatureBuilder};
use crate::layer::LayerBuilder;
use crate::types::Point;
use crate::view::FeatureView;

/// Copies a decoded feature into a layer: id, geometry and attributes, then
/// a commit.
///
/// The geometry stream is spliced verbatim. Version 1/2 properties are
/// re-interned into the target layer's tables; version 3 attribute streams
/// are spliced verbatim and therefore need a target layer built with
/// [`crate::TileBuilder::add_layer_from`] from the same source layer.
pub fn copy_feature(feature: &FeatureView<'_>, layer: &mut LayerBuilder) {
    let mut builder: FeatureBuilder<'_> = FeatureBuilder::new(layer);
    builder.copy_id(feature);
    builder.copy_geometry(feature);
    builder.copy_attributes(feature);
    builder.commit();
}

/// Adds a point or multipoint geometry from any sized sequence of points.
///
/// Fails with [`GeometryError::TooManyPoints`] before writing anything if
/// the sequence reports a length that does not fit the command count field.
pub fn add_points_from_container<I>(
    points: I,
    builder: &mut PointFeatureBuilder<'_>,
) -> Result<(), GeometryError>
where
    I: IntoIterator<Item = Point>,
    I::IntoIter: ExactSizeIterator,
{
    builder.add_points(points)
}
