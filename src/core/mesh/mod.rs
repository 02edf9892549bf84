pub mod aggregator;
pub mod builder;

use std::collections::{BTreeMap, HashMap};

use crate::core::material::MaterialTable;
use crate::core::shared::{Vec2f, Vec3f};

/// One decompressed primitive in canonical form.
/// Constructed by [`builder::PrimitiveAssembler`] and immutable afterwards.
/// Joints and weights are flattened, four values per vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedPrimitive {
    pub(crate) positions: Vec<Vec3f>,
    pub(crate) normals: Option<Vec<Vec3f>>,
    pub(crate) uvs: Option<Vec<Vec2f>>,
    pub(crate) joints: Option<Vec<i32>>,
    pub(crate) weights: Option<Vec<f32>>,
    pub(crate) indices: Vec<i32>,
    pub(crate) material_index: Option<usize>,
    pub(crate) surface_name: String,
    pub(crate) blend_shape_count: usize,
}

impl DecodedPrimitive {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn get_positions(&self) -> &[Vec3f] {
        &self.positions
    }

    pub fn get_normals(&self) -> Option<&[Vec3f]> {
        self.normals.as_deref()
    }

    pub fn get_uvs(&self) -> Option<&[Vec2f]> {
        self.uvs.as_deref()
    }

    pub fn get_joints(&self) -> Option<&[i32]> {
        self.joints.as_deref()
    }

    pub fn get_weights(&self) -> Option<&[f32]> {
        self.weights.as_deref()
    }

    pub fn get_indices(&self) -> &[i32] {
        &self.indices
    }

    pub fn get_material_index(&self) -> Option<usize> {
        self.material_index
    }

    pub fn get_surface_name(&self) -> &str {
        &self.surface_name
    }

    /// Number of morph targets the primitive declares.
    pub fn get_blend_shape_count(&self) -> usize {
        self.blend_shape_count
    }
}

/// All primitives of one mesh entity, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshAggregate {
    pub(crate) original_name: String,
    pub(crate) primitives: Vec<DecodedPrimitive>,
    pub(crate) blend_shape_names: Vec<String>,
}

impl MeshAggregate {
    pub fn get_name(&self) -> &str {
        &self.original_name
    }

    pub fn get_primitives(&self) -> &[DecodedPrimitive] {
        &self.primitives
    }

    pub fn get_blend_shape_names(&self) -> &[String] {
        &self.blend_shape_names
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Attaches materials to the primitives and turns them into surfaces.
    /// A material index the table cannot resolve leaves the surface without
    /// a material.
    pub fn into_imported<T>(self, materials: &T) -> ImportedMesh<T::Material>
        where T: MaterialTable + ?Sized
    {
        let Self { original_name, primitives, blend_shape_names } = self;
        let surfaces = primitives.into_iter()
            .map(|primitive| {
                let material = primitive.material_index.and_then(|idx| {
                    let material = materials.material(idx);
                    if material.is_none() {
                        tracing::warn!(
                            mesh = %original_name,
                            material = idx,
                            "material index does not resolve, surface left without material"
                        );
                    }
                    material
                });
                Surface {
                    name: primitive.surface_name.clone(),
                    material,
                    primitive,
                }
            })
            .collect();

        ImportedMesh {
            name: original_name,
            surfaces,
            blend_shape_names,
        }
    }
}

/// A renderable surface: one decoded primitive with its resolved material.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface<M> {
    pub name: String,
    pub material: Option<M>,
    pub primitive: DecodedPrimitive,
}

/// The mesh written back into the host's mesh table.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedMesh<M> {
    pub name: String,
    pub surfaces: Vec<Surface<M>>,
    pub blend_shape_names: Vec<String>,
}

/// The host's table of mesh entities. Writing a mesh replaces any payload
/// previously stored under the same index.
pub trait MeshTable<M> {
    fn set_mesh(&mut self, mesh_index: usize, mesh: ImportedMesh<M>);
}

impl<M> MeshTable<M> for HashMap<usize, ImportedMesh<M>> {
    fn set_mesh(&mut self, mesh_index: usize, mesh: ImportedMesh<M>) {
        self.insert(mesh_index, mesh);
    }
}

impl<M> MeshTable<M> for BTreeMap<usize, ImportedMesh<M>> {
    fn set_mesh(&mut self, mesh_index: usize, mesh: ImportedMesh<M>) {
        self.insert(mesh_index, mesh);
    }
}
