#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use draco_import::prelude::{AttributeShape, ComponentType, GeometryDecoder};
use serde_json::Value;

/// Payload length used by every scripted blob.
pub const BLOB_LEN: usize = 32;

/// A decoded mesh the scripted decoder hands out. Attributes are stored as
/// (component type, shape, little-endian bytes).
#[derive(Clone, Default)]
pub struct ScriptedMesh {
    pub vertex_count: u32,
    pub attributes: HashMap<u32, (ComponentType, AttributeShape, Vec<u8>)>,
    pub indices: Vec<u32>,
}

impl ScriptedMesh {
    pub fn quad(x: f32) -> Self {
        let positions = [x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x + 1.0, 1.0, 0.0, x, 1.0, 0.0];
        let normals = [0.0f32, 0.0, 1.0].repeat(4);
        let uvs = [0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let mut mesh = ScriptedMesh { vertex_count: 4, indices: vec![0, 1, 2, 0, 2, 3], ..Default::default() };
        mesh.attributes.insert(0, (ComponentType::F32, AttributeShape::Vec3, f32_bytes(&positions)));
        mesh.attributes.insert(1, (ComponentType::F32, AttributeShape::Vec3, f32_bytes(&normals)));
        mesh.attributes.insert(2, (ComponentType::F32, AttributeShape::Vec2, f32_bytes(&uvs)));
        mesh
    }
}

pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[derive(Default)]
pub struct ScriptedHandle {
    mesh: Option<ScriptedMesh>,
    attribute: Option<(u32, Vec<u8>)>,
    indices: Vec<u8>,
}

/// Decoder keyed by the first four bytes of the payload. Counts every call
/// that acquires or releases a handle.
#[derive(Default)]
pub struct ScriptedDecoder {
    meshes: HashMap<u32, ScriptedMesh>,
    created: AtomicUsize,
    released: AtomicUsize,
    decode_calls: AtomicUsize,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: u32, mesh: ScriptedMesh) -> Self {
        self.meshes.insert(key, mesh);
        self
    }

    pub fn blob(key: u32) -> Vec<u8> {
        let mut blob = key.to_le_bytes().to_vec();
        blob.resize(BLOB_LEN, 0xAA);
        blob
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }
}

impl GeometryDecoder for ScriptedDecoder {
    type Handle = ScriptedHandle;

    fn create(&self) -> Option<ScriptedHandle> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Some(ScriptedHandle::default())
    }

    fn decode(&self, handle: &mut ScriptedHandle, data: &[u8]) -> bool {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        let Some(key) = data.get(..4).map(|k| u32::from_le_bytes([k[0], k[1], k[2], k[3]])) else {
            return false;
        };
        handle.mesh = self.meshes.get(&key).cloned();
        handle.mesh.is_some()
    }

    fn vertex_count(&self, handle: &ScriptedHandle) -> u32 {
        handle.mesh.as_ref().map_or(0, |m| m.vertex_count)
    }

    fn index_count(&self, handle: &ScriptedHandle) -> u32 {
        handle.mesh.as_ref().map_or(0, |m| m.indices.len() as u32)
    }

    fn attribute_byte_length(&self, handle: &ScriptedHandle, attribute_id: u32) -> usize {
        match &handle.attribute {
            Some((id, bytes)) if *id == attribute_id => bytes.len(),
            _ => 0,
        }
    }

    fn indices_byte_length(&self, handle: &ScriptedHandle) -> usize {
        handle.indices.len()
    }

    fn read_attribute(
        &self,
        handle: &mut ScriptedHandle,
        attribute_id: u32,
        component_type: ComponentType,
        shape: AttributeShape,
    ) -> bool {
        let found = handle.mesh.as_ref()
            .and_then(|m| m.attributes.get(&attribute_id))
            .filter(|(c, s, _)| *c == component_type && *s == shape)
            .map(|(_, _, bytes)| bytes.clone());
        handle.attribute = found.map(|bytes| (attribute_id, bytes));
        handle.attribute.is_some()
    }

    fn copy_attribute(&self, handle: &ScriptedHandle, _attribute_id: u32, out: &mut [u8]) {
        if let Some((_, bytes)) = &handle.attribute {
            out.copy_from_slice(bytes);
        }
    }

    fn read_indices(&self, handle: &mut ScriptedHandle, component_type: ComponentType) -> bool {
        let Some(mesh) = &handle.mesh else {
            return false;
        };
        handle.indices = match component_type {
            ComponentType::U16 => mesh.indices.iter().flat_map(|&i| (i as u16).to_le_bytes()).collect(),
            ComponentType::U32 => mesh.indices.iter().flat_map(|i| i.to_le_bytes()).collect(),
            ComponentType::F32 => return false,
        };
        true
    }

    fn copy_indices(&self, handle: &ScriptedHandle, out: &mut [u8]) {
        out.copy_from_slice(&handle.indices);
    }

    fn release(&self, _handle: ScriptedHandle) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Packs a glTF JSON document and its binary chunk into a GLB container.
pub fn glb(json: &Value, bin: &[u8]) -> Vec<u8> {
    let mut json_chunk = serde_json::to_vec(json).unwrap();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let mut bin_chunk = bin.to_vec();
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json_chunk);
    out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin_chunk);
    out
}
