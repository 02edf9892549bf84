//! Conversion of raw decoded streams into the canonical typed arrays.
//!
//! Every function checks the exact byte length before reinterpreting the
//! bytes. Streams are read as little-endian, the layout the decoder writes
//! on every supported target.

use crate::core::attribute::AttributeType;
use crate::core::shared::{ComponentType, Vec2f, Vec3f};

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
    #[error("{att_type:?} stream has {found} bytes, expected {expected}")]
    ByteLength { att_type: AttributeType, expected: usize, found: usize },
    #[error("Index {value} at position {position} does not fit in a signed 32-bit integer")]
    IndexOverflow { position: usize, value: u32 },
    #[error("{att_type:?} stream of {count} elements of {element_size} bytes overflows usize")]
    LengthOverflow { att_type: AttributeType, count: usize, element_size: usize },
    #[error("Indices cannot be stored as {0}")]
    UnsupportedIndexType(ComponentType),
}

pub fn positions(bytes: &[u8], vertex_count: usize) -> Result<Vec<Vec3f>, Err> {
    vec3(bytes, vertex_count, AttributeType::Position)
}

pub fn normals(bytes: &[u8], vertex_count: usize) -> Result<Vec<Vec3f>, Err> {
    vec3(bytes, vertex_count, AttributeType::Normal)
}

pub fn uvs(bytes: &[u8], vertex_count: usize) -> Result<Vec<Vec2f>, Err> {
    check_len(bytes, vertex_count, 2 * 4, AttributeType::TextureCoordinate)?;
    Ok(bytes.chunks_exact(8)
        .map(|c| [f32_at(c, 0), f32_at(c, 4)])
        .collect())
}

/// Widens four unsigned 16-bit joint indices per vertex to `i32`.
/// Every value of `u16` is representable, so no value changes.
pub fn joints(bytes: &[u8], vertex_count: usize) -> Result<Vec<i32>, Err> {
    check_len(bytes, vertex_count, 4 * 2, AttributeType::Joint)?;
    Ok(bytes.chunks_exact(2)
        .map(|c| i32::from(u16::from_le_bytes([c[0], c[1]])))
        .collect())
}

pub fn weights(bytes: &[u8], vertex_count: usize) -> Result<Vec<f32>, Err> {
    check_len(bytes, vertex_count, 4 * 4, AttributeType::Weight)?;
    Ok(bytes.chunks_exact(4)
        .map(|c| f32_at(c, 0))
        .collect())
}

/// Converts a 16- or 32-bit unsigned index stream to `i32`.
pub fn indices(bytes: &[u8], index_count: usize, component: ComponentType) -> Result<Vec<i32>, Err> {
    match component {
        ComponentType::U16 => {
            check_len(bytes, index_count, 2, AttributeType::Indices)?;
            Ok(bytes.chunks_exact(2)
                .map(|c| i32::from(u16::from_le_bytes([c[0], c[1]])))
                .collect())
        }
        ComponentType::U32 => {
            check_len(bytes, index_count, 4, AttributeType::Indices)?;
            bytes.chunks_exact(4)
                .enumerate()
                .map(|(position, c)| {
                    let value = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                    i32::try_from(value).map_err(|_| Err::IndexOverflow { position, value })
                })
                .collect()
        }
        ComponentType::F32 => Err(Err::UnsupportedIndexType(component)),
    }
}

fn vec3(bytes: &[u8], vertex_count: usize, att_type: AttributeType) -> Result<Vec<Vec3f>, Err> {
    check_len(bytes, vertex_count, 3 * 4, att_type)?;
    Ok(bytes.chunks_exact(12)
        .map(|c| [f32_at(c, 0), f32_at(c, 4), f32_at(c, 8)])
        .collect())
}

#[inline]
fn f32_at(chunk: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([chunk[offset], chunk[offset + 1], chunk[offset + 2], chunk[offset + 3]])
}

/// `bytes` must hold exactly `count` elements of `element_size` bytes.
fn check_len(bytes: &[u8], count: usize, element_size: usize, att_type: AttributeType) -> Result<(), Err> {
    let expected = count.checked_mul(element_size)
        .ok_or(Err::LengthOverflow { att_type, count, element_size })?;
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(Err::ByteLength { att_type, expected, found: bytes.len() })
    }
}
