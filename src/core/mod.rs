/// Attribute semantics and on-wire attribute id bookkeeping.
pub mod attribute;

/// Buffer views and the resolution of compressed byte regions.
pub mod buffer;

/// Material lookup.
pub mod material;

/// Decoded primitives, their assembly, and per-mesh aggregation.
pub mod mesh;

pub mod shared;
