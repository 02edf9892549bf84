/// Lookup of materials by the index a primitive refers to. The table itself
/// belongs to the host document or engine.
pub trait MaterialTable {
    type Material: Clone;

    fn material(&self, index: usize) -> Option<Self::Material>;
}

impl<M: Clone> MaterialTable for [M] {
    type Material = M;

    fn material(&self, index: usize) -> Option<M> {
        self.get(index).cloned()
    }
}

impl<M: Clone> MaterialTable for Vec<M> {
    type Material = M;

    fn material(&self, index: usize) -> Option<M> {
        self.as_slice().material(index)
    }
}

/// A reference to a glTF material, as produced by [`crate::io::gltf::Document::materials`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialRef {
    pub index: usize,
    pub name: Option<String>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_lookup() {
        let table = vec!["a", "b", "c"];
        assert_eq!(table.material(2), Some("c"));
        assert_eq!(table.material(3), None);
    }
}
