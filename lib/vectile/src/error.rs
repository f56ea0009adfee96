//! Error types surfaced by the encoder.
//!
//! Only recoverable conditions live here. Wrong builder usage (committing
//! without a geometry, string ids on a version 2 layer, adding to a finished
//! feature) is a programming error and panics instead.

use snafu::Snafu;

/// Errors from geometry validation while building a feature.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GeometryError {
    /// The point count no longer fits the 29-bit command count field.
    #[snafu(display("too many points for one geometry command: {count}"))]
    TooManyPoints {
        /// Number of points the caller tried to encode.
        count: u64,
    },

    /// A geometry part with fewer points than the format allows.
    #[snafu(display("geometry part needs at least {needed} points, got {got}"))]
    TooFewPoints {
        /// Minimum number of points for this part kind.
        needed: usize,
        /// Number of points actually supplied.
        got: usize,
    },

    /// A polygon ring whose last point does not equal its first.
    #[snafu(display("polygon ring is not closed"))]
    RingNotClosed,
}

/// Errors surfaced while serializing the assembled tile.
#[derive(Debug, Snafu)]
pub enum EncodeError {
    /// The underlying protobuf writer failed while emitting the tile stream.
    #[snafu(context(false))]
    #[snafu(display("failed to write tile stream: {source}"))]
    Write {
        /// Error reported by the stream.
        source: protobuf::Error,
    },
}
