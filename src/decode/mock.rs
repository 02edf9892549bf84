//! A scripted [`GeometryDecoder`] for unit tests. The first byte of a blob
//! selects one of the registered meshes; unknown keys fail to decode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::shared::{AttributeShape, ComponentType};
use super::session::{GeometryDecoder, MIN_BLOB_LEN};

#[derive(Clone, Debug)]
struct MockAttribute {
    component: ComponentType,
    shape: AttributeShape,
    bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MockMesh {
    vertex_count: u32,
    attributes: HashMap<u32, MockAttribute>,
    indices: Vec<u32>,
}

impl MockMesh {
    pub fn new(vertex_count: u32) -> Self {
        Self { vertex_count, ..Default::default() }
    }

    pub fn with_f32(self, id: u32, shape: AttributeShape, values: Vec<f32>) -> Self {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.with_raw(id, ComponentType::F32, shape, bytes)
    }

    pub fn with_u16(self, id: u32, shape: AttributeShape, values: Vec<u16>) -> Self {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.with_raw(id, ComponentType::U16, shape, bytes)
    }

    pub fn with_raw(mut self, id: u32, component: ComponentType, shape: AttributeShape, bytes: Vec<u8>) -> Self {
        self.attributes.insert(id, MockAttribute { component, shape, bytes });
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }
}

#[derive(Default)]
pub(crate) struct MockHandle {
    mesh: Option<u8>,
    prepared: HashMap<u32, Vec<u8>>,
    indices: Option<Vec<u8>>,
}

#[derive(Default)]
pub(crate) struct MockDecoder {
    meshes: HashMap<u8, MockMesh>,
    fail_create: bool,
    created: AtomicUsize,
    released: AtomicUsize,
    peak_live: AtomicUsize,
    decode_calls: AtomicUsize,
}

impl MockDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mesh(mut self, key: u8, mesh: MockMesh) -> Self {
        self.meshes.insert(key, mesh);
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// A minimal payload selecting the mesh registered under `key`.
    pub fn blob(key: u8) -> Vec<u8> {
        let mut blob = vec![0u8; MIN_BLOB_LEN];
        blob[0] = key;
        blob
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live_handles(&self) -> usize {
        self.created() - self.released()
    }

    /// Most sessions ever open at the same time.
    pub fn peak_live_handles(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    fn mesh(&self, handle: &MockHandle) -> Option<&MockMesh> {
        handle.mesh.and_then(|key| self.meshes.get(&key))
    }
}

impl GeometryDecoder for MockDecoder {
    type Handle = MockHandle;

    fn create(&self) -> Option<MockHandle> {
        if self.fail_create {
            return None;
        }
        let created = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let live = created.saturating_sub(self.released.load(Ordering::SeqCst));
        self.peak_live.fetch_max(live, Ordering::SeqCst);
        Some(MockHandle::default())
    }

    fn decode(&self, handle: &mut MockHandle, data: &[u8]) -> bool {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        match data.first() {
            Some(key) if self.meshes.contains_key(key) => {
                handle.mesh = Some(*key);
                true
            }
            _ => false,
        }
    }

    fn vertex_count(&self, handle: &MockHandle) -> u32 {
        self.mesh(handle).map_or(0, |m| m.vertex_count)
    }

    fn index_count(&self, handle: &MockHandle) -> u32 {
        self.mesh(handle).map_or(0, |m| m.indices.len() as u32)
    }

    fn attribute_byte_length(&self, handle: &MockHandle, attribute_id: u32) -> usize {
        handle.prepared.get(&attribute_id).map_or(0, Vec::len)
    }

    fn indices_byte_length(&self, handle: &MockHandle) -> usize {
        handle.indices.as_ref().map_or(0, Vec::len)
    }

    fn read_attribute(
        &self,
        handle: &mut MockHandle,
        attribute_id: u32,
        component_type: ComponentType,
        shape: AttributeShape,
    ) -> bool {
        let bytes = match self.mesh(handle).and_then(|m| m.attributes.get(&attribute_id)) {
            Some(att) if att.component == component_type && att.shape == shape => att.bytes.clone(),
            _ => return false,
        };
        handle.prepared.insert(attribute_id, bytes);
        true
    }

    fn copy_attribute(&self, handle: &MockHandle, attribute_id: u32, out: &mut [u8]) {
        if let Some(bytes) = handle.prepared.get(&attribute_id) {
            out.copy_from_slice(bytes);
        }
    }

    fn read_indices(&self, handle: &mut MockHandle, component_type: ComponentType) -> bool {
        let Some(indices) = self.mesh(handle).map(|m| m.indices.clone()) else {
            return false;
        };
        let bytes: Vec<u8> = match component_type {
            ComponentType::U16 => {
                if indices.iter().any(|&i| i > u16::MAX as u32) {
                    return false;
                }
                indices.iter().flat_map(|&i| (i as u16).to_le_bytes()).collect()
            }
            ComponentType::U32 => indices.iter().flat_map(|i| i.to_le_bytes()).collect(),
            ComponentType::F32 => return false,
        };
        handle.indices = Some(bytes);
        true
    }

    fn copy_indices(&self, handle: &MockHandle, out: &mut [u8]) {
        if let Some(bytes) = &handle.indices {
            out.copy_from_slice(bytes);
        }
    }

    fn release(&self, _handle: MockHandle) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
