// lib.rs

/// Contains the shared definitions, buffers, attributes and decoded meshes.
pub mod core;

/// Decodes compressed primitives and assembles them into meshes.
pub mod decode;

/// Contains the interface between glTF documents and the decoder.
pub mod io;


/// Contains the most commonly used traits, types, and objects.
pub mod prelude {
    pub use crate::core::attribute::{AttributeIdMap, AttributeIdSet, AttributeType};
    pub use crate::core::buffer::{BufferRegionResolver, BufferSource, BufferView};
    pub use crate::core::material::{MaterialRef, MaterialTable};
    pub use crate::core::mesh::{DecodedPrimitive, ImportedMesh, MeshAggregate, MeshTable, Surface};
    pub use crate::core::shared::{AttributeShape, ComponentType, ConfigType};
    pub use crate::decode::session::GeometryDecoder;
    pub use crate::decode::{self, decode_mesh, decode_primitive, FailurePolicy};
    pub use crate::io::gltf::{self, import_document, Document};
}
