use super::{DecodedPrimitive, MeshAggregate};

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
    #[error("Primitive carries {found} blend shapes, but the mesh records {expected}")]
    BlendShapeMismatch { expected: usize, found: usize },
}

/// Collects the decoded primitives of one mesh entity.
///
/// The aggregate only becomes visible through [`MeshAggregator::finalize`],
/// which consumes the aggregator; an abandoned aggregator publishes nothing.
#[derive(Debug)]
pub struct MeshAggregator {
    name: String,
    declared_target_names: Vec<String>,
    primitives: Vec<DecodedPrimitive>,
    blend_shape_names: Option<Vec<String>>,
}

impl MeshAggregator {
    pub fn begin(mesh_name: impl Into<String>) -> Self {
        Self {
            name: mesh_name.into(),
            declared_target_names: Vec::new(),
            primitives: Vec::new(),
            blend_shape_names: None,
        }
    }

    /// Target names declared by the mesh (glTF `extras.targetNames`).
    pub fn with_target_names(mut self, names: Vec<String>) -> Self {
        self.declared_target_names = names;
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Appends the next primitive in declaration order.
    ///
    /// The first primitive that carries blend shapes fixes the blend-shape
    /// names of the mesh; every later primitive with blend shapes must carry
    /// the same number of them. Primitives without blend shapes are accepted
    /// as they are.
    pub fn append(&mut self, mut primitive: DecodedPrimitive) -> Result<(), Err> {
        let count = primitive.blend_shape_count;
        if count > 0 {
            match &self.blend_shape_names {
                Some(names) if names.len() != count => {
                    return Err(Err::BlendShapeMismatch { expected: names.len(), found: count });
                }
                Some(_) => {}
                None => self.blend_shape_names = Some(self.blend_shape_names_for(count)),
            }
        }

        if primitive.surface_name.is_empty() {
            primitive.surface_name = self.name.clone();
        }
        self.primitives.push(primitive);
        Ok(())
    }

    pub fn finalize(self) -> MeshAggregate {
        MeshAggregate {
            original_name: self.name,
            primitives: self.primitives,
            blend_shape_names: self.blend_shape_names.unwrap_or_default(),
        }
    }

    fn blend_shape_names_for(&self, count: usize) -> Vec<String> {
        if self.declared_target_names.len() == count {
            return self.declared_target_names.clone();
        }
        if !self.declared_target_names.is_empty() {
            tracing::warn!(
                mesh = %self.name,
                declared = self.declared_target_names.len(),
                found = count,
                "declared target names do not match the blend shape count, generating names"
            );
        }
        (0..count).map(|i| format!("morph_{}", i)).collect()
    }
}
