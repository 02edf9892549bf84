use crate::core::attribute::AttributeType;
use crate::core::buffer::{BufferRegionResolver, BufferSource};
use crate::core::mesh::builder::{NormalizedAttributes, PrimitiveAssembler};
use crate::core::mesh::DecodedPrimitive;
use crate::core::shared::ComponentType;
use super::descriptor::PrimitiveDescriptor;
use super::normalizer;
use super::session::{self, DecodeSession, GeometryDecoder, MIN_BLOB_LEN};
use super::{Config, Err};

/// Decodes one compressed primitive.
///
/// The byte region is resolved and the attribute ids are validated before
/// any decoder handle exists. Position and indices are required; an optional
/// attribute that cannot be read ends up absent.
pub fn decode_primitive<S, D>(
    source: &S,
    descriptor: &PrimitiveDescriptor,
    decoder: &D,
    cfg: &Config,
) -> Result<DecodedPrimitive, Err>
    where
        S: BufferSource + ?Sized,
        D: GeometryDecoder + ?Sized,
{
    let _span = tracing::debug_span!("decode_primitive", buffer_view = descriptor.buffer_view).entered();

    let blob = BufferRegionResolver::new(source).resolve(descriptor.buffer_view)?;
    let ids = descriptor.attribute_ids()?;
    if blob.len() < MIN_BLOB_LEN {
        return Err(session::Err::BlobTooSmall { len: blob.len() }.into());
    }

    let mut session = DecodeSession::create(decoder)?;
    session.decode(blob)?;
    let vertex_count = session.vertex_count() as usize;
    let index_count = session.index_count() as usize;
    tracing::debug!(bytes = blob.len(), vertex_count, index_count, "decoded payload");

    if let Some(expected) = descriptor.expected_vertex_count {
        if expected != vertex_count {
            tracing::warn!(
                declared = expected,
                decoded = vertex_count,
                "POSITION accessor count differs from the decoded vertex count"
            );
        }
    }

    let position_bytes = session.fetch_attribute(
        ids.position,
        AttributeType::Position.component_type(),
        AttributeType::Position.shape(),
    )?;
    let positions = normalizer::positions(&position_bytes, vertex_count)?;

    let normals = optional_attribute(&mut session, ids.normal, AttributeType::Normal, |b| {
        normalizer::normals(b, vertex_count)
    });
    let uvs = optional_attribute(&mut session, ids.tex_coord, AttributeType::TextureCoordinate, |b| {
        normalizer::uvs(b, vertex_count)
    });
    let joints = optional_attribute(&mut session, ids.joints, AttributeType::Joint, |b| {
        normalizer::joints(b, vertex_count)
    });
    let weights = optional_attribute(&mut session, ids.weights, AttributeType::Weight, |b| {
        normalizer::weights(b, vertex_count)
    });

    let index_type = cfg.index_component_type
        .or(descriptor.index_component_type)
        .unwrap_or(ComponentType::U32);
    session.read_indices(index_type)?;
    let index_bytes = session.copy_indices()?;
    session.release();

    let indices = normalizer::indices(&index_bytes, index_count, index_type)?;

    let attributes = NormalizedAttributes { positions, normals, uvs, joints, weights };
    let primitive = PrimitiveAssembler::new(vertex_count, index_count)
        .material(descriptor.material)
        .surface_name(descriptor.name.clone())
        .blend_shapes(descriptor.target_count)
        .assemble(attributes, indices)?;
    Ok(primitive)
}

fn optional_attribute<D, T, F>(
    session: &mut DecodeSession<'_, D>,
    id: Option<u32>,
    att_type: AttributeType,
    normalize: F,
) -> Option<T>
    where
        D: GeometryDecoder + ?Sized,
        F: FnOnce(&[u8]) -> Result<T, normalizer::Err>,
{
    let id = id?;
    let bytes = session.fetch_attribute(id, att_type.component_type(), att_type.shape())
        .map_err(|err| {
            tracing::warn!(attribute = att_type.gltf_name(), id, %err, "optional attribute treated as absent");
        })
        .ok()?;
    normalize(&bytes)
        .map_err(|err| {
            tracing::warn!(attribute = att_type.gltf_name(), id, %err, "optional attribute treated as absent");
        })
        .ok()
}
