use thiserror::Error;

use crate::core::attribute::AttributeType;
use crate::core::shared::{Vec2f, Vec3f};
use super::DecodedPrimitive;

/// The typed attribute arrays of one primitive, as produced by the normalizer.
/// `None` means the attribute is absent, which is different from an
/// attribute that is present and zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedAttributes {
    pub positions: Vec<Vec3f>,
    pub normals: Option<Vec<Vec3f>>,
    pub uvs: Option<Vec<Vec2f>>,
    pub joints: Option<Vec<i32>>,
    pub weights: Option<Vec<f32>>,
}

/// Combines normalized arrays into a [`DecodedPrimitive`].
pub struct PrimitiveAssembler {
    vertex_count: usize,
    index_count: usize,
    material_index: Option<usize>,
    surface_name: Option<String>,
    blend_shape_count: usize,
}

impl PrimitiveAssembler {
    pub fn new(vertex_count: usize, index_count: usize) -> Self {
        Self {
            vertex_count,
            index_count,
            material_index: None,
            surface_name: None,
            blend_shape_count: 0,
        }
    }

    pub fn material(mut self, material_index: Option<usize>) -> Self {
        self.material_index = material_index;
        self
    }

    /// An unnamed primitive later takes the name of its mesh.
    pub fn surface_name(mut self, surface_name: Option<String>) -> Self {
        self.surface_name = surface_name;
        self
    }

    pub fn blend_shapes(mut self, count: usize) -> Self {
        self.blend_shape_count = count;
        self
    }

    pub fn assemble(self, attributes: NormalizedAttributes, indices: Vec<i32>) -> Result<DecodedPrimitive, Err> {
        let Self { vertex_count, index_count, material_index, surface_name, blend_shape_count } = self;
        let NormalizedAttributes { positions, normals, uvs, joints, weights } = attributes;

        if positions.len() != vertex_count {
            return Err(Err::PositionCount { expected: vertex_count, found: positions.len() });
        }
        if indices.len() != index_count {
            return Err(Err::IndexCount { expected: index_count, found: indices.len() });
        }
        if let Some((position, &index)) = indices.iter()
            .enumerate()
            .find(|&(_, &i)| i < 0 || i as usize >= vertex_count)
        {
            return Err(Err::IndexOutOfBounds { position, index, vertex_count });
        }

        Ok(DecodedPrimitive {
            positions,
            normals: keep_if_len(normals, vertex_count, AttributeType::Normal),
            uvs: keep_if_len(uvs, vertex_count, AttributeType::TextureCoordinate),
            joints: keep_if_len(joints, 4 * vertex_count, AttributeType::Joint),
            weights: keep_if_len(weights, 4 * vertex_count, AttributeType::Weight),
            indices,
            material_index,
            surface_name: surface_name.unwrap_or_default(),
            blend_shape_count,
        })
    }
}

/// Optional attributes of the wrong length are dropped, not fatal.
fn keep_if_len<T>(values: Option<Vec<T>>, expected: usize, att_type: AttributeType) -> Option<Vec<T>> {
    match values {
        Some(v) if v.len() != expected => {
            tracing::warn!(
                attribute = att_type.gltf_name(),
                expected,
                found = v.len(),
                "dropping optional attribute with unexpected length"
            );
            None
        }
        other => other,
    }
}

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Err {
    #[error("Expected {expected} indices, found {found}")]
    IndexCount { expected: usize, found: usize },
    #[error("Index {index} at position {position} is outside of 0..{vertex_count}")]
    IndexOutOfBounds { position: usize, index: i32, vertex_count: usize },
    #[error("Expected {expected} positions, found {found}")]
    PositionCount { expected: usize, found: usize },
}


#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> NormalizedAttributes {
        NormalizedAttributes {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            normals: Some(vec![[0.0, 0.0, 1.0]; 4]),
            uvs: Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
            joints: None,
            weights: None,
        }
    }

    #[test]
    fn assembles_quad() {
        let primitive = PrimitiveAssembler::new(4, 6)
            .material(Some(2))
            .surface_name(Some("roof".to_string()))
            .assemble(quad(), vec![0, 1, 2, 0, 2, 3])
            .unwrap();
        assert_eq!(primitive.vertex_count(), 4);
        assert_eq!(primitive.index_count(), 6);
        assert_eq!(primitive.get_normals().map(|n| n.len()), Some(4));
        assert!(primitive.get_joints().is_none());
        assert_eq!(primitive.get_material_index(), Some(2));
        assert_eq!(primitive.get_surface_name(), "roof");
    }

    #[test]
    fn wrong_optional_length_is_dropped() {
        let mut atts = quad();
        atts.uvs = Some(vec![[0.0, 0.0]; 3]);
        atts.weights = Some(vec![0.25; 16]);
        let primitive = PrimitiveAssembler::new(4, 3)
            .assemble(atts, vec![0, 1, 2])
            .unwrap();
        assert!(primitive.get_uvs().is_none());
        assert_eq!(primitive.get_weights().map(|w| w.len()), Some(16));
        assert_eq!(primitive.get_surface_name(), "");
    }

    #[test]
    fn required_lengths_are_fatal() {
        assert_eq!(
            PrimitiveAssembler::new(5, 6).assemble(quad(), vec![0, 1, 2, 0, 2, 3]).unwrap_err(),
            Err::PositionCount { expected: 5, found: 4 }
        );
        assert_eq!(
            PrimitiveAssembler::new(4, 6).assemble(quad(), vec![0, 1, 2]).unwrap_err(),
            Err::IndexCount { expected: 6, found: 3 }
        );
    }

    #[test]
    fn indices_must_address_vertices() {
        assert_eq!(
            PrimitiveAssembler::new(4, 3).assemble(quad(), vec![0, 4, 2]).unwrap_err(),
            Err::IndexOutOfBounds { position: 1, index: 4, vertex_count: 4 }
        );
    }
}
