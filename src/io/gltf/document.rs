use base64::Engine;
use serde_json::Value;

use crate::core::buffer::{BufferSource, BufferView};
use crate::core::material::MaterialRef;
use crate::core::shared::ComponentType;
use crate::decode::descriptor;
use crate::decode::{self, ErrorKind, MeshDescriptor, PrimitiveDescriptor};
use super::EXTENSION_NAME;

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
    #[error("Buffer {buffer} holds an invalid base64 data URI: {message}")]
    Base64 { buffer: usize, message: String },
    #[error("Buffer index {index} is out of range ({count} buffers)")]
    BufferOutOfRange { index: usize, count: usize },
    #[error(transparent)]
    Descriptor(#[from] descriptor::Err),
    #[error("Failed to parse GLB container: {0}")]
    Glb(String),
    #[error("Failed to parse glTF JSON: {0}")]
    Json(String),
    #[error("Mesh index {index} is out of range ({count} meshes)")]
    MeshOutOfRange { index: usize, count: usize },
    #[error("Primitive index {index} of mesh {mesh} is out of range ({count} primitives)")]
    PrimitiveOutOfRange { mesh: usize, index: usize, count: usize },
}

impl Err {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Err::Descriptor(_) => ErrorKind::MissingKey,
            Err::BufferOutOfRange { .. } | Err::MeshOutOfRange { .. } | Err::PrimitiveOutOfRange { .. } => ErrorKind::Range,
            Err::Base64 { .. } | Err::Glb(_) | Err::Json(_) => ErrorKind::Document,
        }
    }
}

/// An in-memory glTF document: the parsed JSON plus whatever binary buffers
/// could be loaded without touching the file system.
///
/// Buffers come from the GLB `BIN` chunk (uri-less buffer 0), from base64
/// `data:` URIs, or from the caller via [`Document::set_buffer`].
#[derive(Debug, Clone)]
pub struct Document {
    json: Value,
    buffer_views: Vec<BufferView>,
    buffers: Vec<Option<Vec<u8>>>,
    /// `byteLength` of each declared buffer
    buffer_lengths: Vec<Option<usize>>,
}

impl Document {
    pub fn from_glb(bytes: &[u8]) -> Result<Self, Err> {
        let glb = gltf::Glb::from_slice(bytes).map_err(|e| Err::Glb(e.to_string()))?;
        let json: Value = serde_json::from_slice(&glb.json).map_err(|e| Err::Json(e.to_string()))?;
        Self::load(json, glb.bin.as_deref())
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, Err> {
        let json: Value = serde_json::from_slice(bytes).map_err(|e| Err::Json(e.to_string()))?;
        Self::load(json, None)
    }

    pub fn from_value(json: Value) -> Result<Self, Err> {
        Self::load(json, None)
    }

    fn load(json: Value, bin: Option<&[u8]>) -> Result<Self, Err> {
        let buffer_views = match json.get("bufferViews") {
            None => Vec::new(),
            Some(views) => serde_json::from_value(views.clone())
                .map_err(|e| descriptor::Err::InvalidValue { key: "bufferViews".to_owned(), value: e.to_string() })?,
        };

        let declared = json.get("buffers").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        let mut buffers = Vec::with_capacity(declared.len());
        let mut buffer_lengths = Vec::with_capacity(declared.len());
        for (index, buffer) in declared.iter().enumerate() {
            buffer_lengths.push(index_field(buffer, "byteLength")?);
            let uri = buffer.get("uri").and_then(Value::as_str);
            let data = match uri {
                None if index == 0 => bin.map(<[u8]>::to_vec),
                None => None,
                Some(uri) => match uri.strip_prefix("data:") {
                    Some(data_uri) => Some(decode_data_uri(index, data_uri)?),
                    None => {
                        tracing::debug!(buffer = index, uri, "external buffer must be supplied by the caller");
                        None
                    }
                },
            };
            buffers.push(data);
        }

        tracing::debug!(
            buffer_views = buffer_views.len(),
            buffers = buffers.len(),
            loaded = buffers.iter().filter(|b| b.is_some()).count(),
            "loaded glTF document"
        );
        Ok(Self { json, buffer_views, buffers, buffer_lengths })
    }

    /// Supplies the bytes of a buffer the document could not load itself.
    pub fn set_buffer(&mut self, index: usize, data: Vec<u8>) -> Result<(), Err> {
        let count = self.buffers.len();
        let slot = self.buffers.get_mut(index).ok_or(Err::BufferOutOfRange { index, count })?;
        *slot = Some(data);
        Ok(())
    }

    pub fn get_json(&self) -> &Value {
        &self.json
    }

    /// Preflight: whether `extensionsUsed` names the compression extension.
    pub fn uses_compression(&self) -> bool {
        self.json.get("extensionsUsed")
            .and_then(Value::as_array)
            .is_some_and(|exts| exts.iter().any(|e| e.as_str() == Some(EXTENSION_NAME)))
    }

    pub fn materials(&self) -> Vec<MaterialRef> {
        self.array("materials")
            .iter()
            .enumerate()
            .map(|(index, material)| MaterialRef {
                index,
                name: material.get("name").and_then(Value::as_str).map(str::to_owned),
            })
            .collect()
    }

    pub fn mesh_count(&self) -> usize {
        self.array("meshes").len()
    }

    /// Whether any primitive of the mesh carries the compression extension.
    pub fn has_compressed_primitive(&self, mesh_index: usize) -> bool {
        self.array("meshes")
            .get(mesh_index)
            .and_then(|mesh| mesh.get("primitives"))
            .and_then(Value::as_array)
            .is_some_and(|prims| prims.iter().any(|p| compression_extension(p).is_some()))
    }

    /// Typed description of a mesh. A primitive that cannot be described is
    /// kept in place as an error.
    pub fn mesh_descriptor(&self, mesh_index: usize) -> Result<MeshDescriptor, Err> {
        let mesh = self.mesh(mesh_index)?;
        let primitives = mesh.get("primitives")
            .and_then(Value::as_array)
            .ok_or_else(|| descriptor::Err::MissingKey(format!("meshes[{}].primitives", mesh_index)))?;

        let name = mesh.get("name")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("mesh_{}", mesh_index));

        let target_names = mesh.get("extras")
            .and_then(|extras| extras.get("targetNames"))
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default();

        let primitives = primitives.iter()
            .enumerate()
            .map(|(index, primitive)| {
                self.describe_primitive(mesh_index, index, primitive).map_err(decode::Err::from)
            })
            .collect();

        Ok(MeshDescriptor { name, target_names, primitives })
    }

    pub fn primitive_descriptor(&self, mesh_index: usize, primitive_index: usize) -> Result<PrimitiveDescriptor, Err> {
        let mesh = self.mesh(mesh_index)?;
        let primitives = mesh.get("primitives").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        let primitive = primitives.get(primitive_index).ok_or(Err::PrimitiveOutOfRange {
            mesh: mesh_index,
            index: primitive_index,
            count: primitives.len(),
        })?;
        Ok(self.describe_primitive(mesh_index, primitive_index, primitive)?)
    }

    fn describe_primitive(
        &self,
        mesh_index: usize,
        primitive_index: usize,
        primitive: &Value,
    ) -> Result<PrimitiveDescriptor, descriptor::Err> {
        let path = format!("meshes[{}].primitives[{}]", mesh_index, primitive_index);
        let extension = compression_extension(primitive)
            .ok_or_else(|| descriptor::Err::MissingKey(format!("{}.extensions.{}", path, EXTENSION_NAME)))?;

        let buffer_view = index_field(extension, "bufferView")?
            .ok_or_else(|| descriptor::Err::MissingKey(format!("{}.extensions.{}.bufferView", path, EXTENSION_NAME)))?;
        let ids = extension.get("attributes")
            .ok_or_else(|| descriptor::Err::MissingKey(format!("{}.extensions.{}.attributes", path, EXTENSION_NAME)))?;

        let indices_accessor = index_field(primitive, "indices")?;
        let position_accessor = primitive.get("attributes")
            .map(|atts| index_field(atts, "POSITION"))
            .transpose()?
            .flatten();

        let expected_vertex_count = position_accessor
            .and_then(|idx| self.accessor(idx))
            .and_then(|acc| acc.get("count"))
            .and_then(Value::as_u64)
            .and_then(|count| usize::try_from(count).ok());

        let index_component_type = indices_accessor
            .and_then(|idx| self.accessor(idx))
            .and_then(|acc| acc.get("componentType"))
            .and_then(Value::as_u64)
            .and_then(|code| index_component_type(code, &path));

        Ok(PrimitiveDescriptor {
            buffer_view,
            position_id: id_field(ids, "POSITION")?,
            normal_id: id_field(ids, "NORMAL")?,
            tex_coord_id: id_field(ids, "TEXCOORD_0")?,
            joints_id: id_field(ids, "JOINTS_0")?,
            weights_id: id_field(ids, "WEIGHTS_0")?,
            indices_id: indices_accessor.map_or(-1, |idx| idx as i64),
            material: index_field(primitive, "material")?,
            name: primitive.get("extras")
                .and_then(|extras| extras.get("name"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            index_component_type,
            expected_vertex_count,
            target_count: primitive.get("targets").and_then(Value::as_array).map_or(0, Vec::len),
        })
    }

    fn mesh(&self, mesh_index: usize) -> Result<&Value, Err> {
        let meshes = self.array("meshes");
        meshes.get(mesh_index).ok_or(Err::MeshOutOfRange { index: mesh_index, count: meshes.len() })
    }

    fn accessor(&self, index: usize) -> Option<&Value> {
        self.array("accessors").get(index)
    }

    fn array(&self, key: &str) -> &[Value] {
        self.json.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
    }
}

impl BufferSource for Document {
    fn buffer_view_count(&self) -> usize {
        self.buffer_views.len()
    }

    fn buffer_view(&self, index: usize) -> Option<BufferView> {
        self.buffer_views.get(index).copied()
    }

    fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn declared_buffer_len(&self, index: usize) -> Option<usize> {
        self.buffer_lengths.get(index).copied().flatten()
    }

    fn buffer(&self, index: usize) -> Option<&[u8]> {
        self.buffers.get(index)?.as_deref()
    }
}

fn compression_extension(primitive: &Value) -> Option<&Value> {
    primitive.get("extensions")?.get(EXTENSION_NAME)
}

fn decode_data_uri(buffer: usize, data_uri: &str) -> Result<Vec<u8>, Err> {
    let (_, payload) = data_uri.split_once(";base64,").ok_or_else(|| Err::Base64 {
        buffer,
        message: "only base64 data URIs are supported".to_owned(),
    })?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Err::Base64 { buffer, message: e.to_string() })
}

/// A non-negative index, absent when the key is missing or null.
fn index_field(object: &Value, key: &str) -> Result<Option<usize>, descriptor::Err> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| descriptor::Err::InvalidValue { key: key.to_owned(), value: value.to_string() }),
    }
}

/// An on-wire attribute id, `-1` when absent.
fn id_field(attributes: &Value, key: &str) -> Result<i64, descriptor::Err> {
    match attributes.get(key) {
        None | Some(Value::Null) => Ok(-1),
        Some(value) => value.as_i64()
            .ok_or_else(|| descriptor::Err::InvalidValue { key: key.to_owned(), value: value.to_string() }),
    }
}

/// 8-bit indices are promoted to 16-bit.
fn index_component_type(code: u64, path: &str) -> Option<ComponentType> {
    const UNSIGNED_BYTE: u64 = 5121;
    if code == UNSIGNED_BYTE {
        return Some(ComponentType::U16);
    }
    let component = u32::try_from(code).ok()
        .and_then(ComponentType::from_gl_code)
        .filter(|c| *c != ComponentType::F32);
    if component.is_none() {
        tracing::warn!(primitive = path, code, "unsupported index component type, falling back");
    }
    component
}
