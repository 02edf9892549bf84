use crate::core::attribute::{self, AttributeIdMap};
use crate::core::shared::ComponentType;

/// A document value the typed schema cannot be built from.
#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
    #[error("Missing key: {0}")]
    MissingKey(String),
}

/// Everything the pipeline needs to know about one compressed primitive,
/// extracted from the document once.
///
/// Attribute ids are kept in their signed on-wire form (negative means
/// absent) and validated when the primitive is decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimitiveDescriptor {
    pub buffer_view: usize,
    pub position_id: i64,
    pub normal_id: i64,
    pub tex_coord_id: i64,
    pub joints_id: i64,
    pub weights_id: i64,
    pub indices_id: i64,
    pub material: Option<usize>,
    pub name: Option<String>,
    /// component type of the indices accessor, used as the decode width
    /// unless the config overrides it
    pub index_component_type: Option<ComponentType>,
    /// count of the POSITION accessor, if the document declares one
    pub expected_vertex_count: Option<usize>,
    /// number of morph targets declared on the primitive
    pub target_count: usize,
}

impl PrimitiveDescriptor {
    pub fn new(buffer_view: usize, position_id: i64, indices_id: i64) -> Self {
        Self {
            buffer_view,
            position_id,
            normal_id: -1,
            tex_coord_id: -1,
            joints_id: -1,
            weights_id: -1,
            indices_id,
            material: None,
            name: None,
            index_component_type: None,
            expected_vertex_count: None,
            target_count: 0,
        }
    }

    pub fn attribute_ids(&self) -> Result<AttributeIdMap, attribute::Err> {
        AttributeIdMap::from_raw(
            self.position_id,
            self.normal_id,
            self.tex_coord_id,
            self.joints_id,
            self.weights_id,
            self.indices_id,
        )
    }
}

/// One mesh entity and its primitives in declaration order. A primitive whose
/// description could not be extracted is kept as an error so the failure
/// policy sees it at its position.
#[derive(Debug)]
pub struct MeshDescriptor {
    pub name: String,
    pub target_names: Vec<String>,
    pub primitives: Vec<Result<PrimitiveDescriptor, super::Err>>,
}

impl MeshDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_names: Vec::new(),
            primitives: Vec::new(),
        }
    }

    pub fn with_primitive(mut self, primitive: PrimitiveDescriptor) -> Self {
        self.primitives.push(Ok(primitive));
        self
    }
}
