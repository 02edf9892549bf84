use std::fmt;

use crate::core::shared::{AttributeShape, ComponentType};

/// Payloads shorter than this cannot hold a valid compressed mesh.
pub const MIN_BLOB_LEN: usize = 32;

/// Call contract of the external geometry decoder.
///
/// The decoder itself is shared (`&self`); all per-primitive state lives in
/// the handle, which is created, used and released by exactly one
/// [`DecodeSession`]. Buffers handed to `copy_attribute` and `copy_indices`
/// are sized to the byte lengths the decoder reports for the prepared
/// stream.
pub trait GeometryDecoder {
    type Handle;

    /// Allocates a decoder instance. `None` signals an allocation failure.
    fn create(&self) -> Option<Self::Handle>;

    fn decode(&self, handle: &mut Self::Handle, data: &[u8]) -> bool;

    fn vertex_count(&self, handle: &Self::Handle) -> u32;

    fn index_count(&self, handle: &Self::Handle) -> u32;

    fn attribute_byte_length(&self, handle: &Self::Handle, attribute_id: u32) -> usize;

    fn indices_byte_length(&self, handle: &Self::Handle) -> usize;

    /// Prepares the attribute for extraction in the requested encoding.
    fn read_attribute(
        &self,
        handle: &mut Self::Handle,
        attribute_id: u32,
        component_type: ComponentType,
        shape: AttributeShape,
    ) -> bool;

    fn copy_attribute(&self, handle: &Self::Handle, attribute_id: u32, out: &mut [u8]);

    /// Prepares the index stream, converted to the requested width.
    fn read_indices(&self, handle: &mut Self::Handle, component_type: ComponentType) -> bool;

    fn copy_indices(&self, handle: &Self::Handle, out: &mut [u8]);

    fn release(&self, handle: Self::Handle);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Created,
    BlobDecoded,
    AttributeRead,
    IndicesRead,
    Released,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
    #[error("Decoder reports {reported} bytes for attribute {id}, expected {expected}")]
    AttributeLength { id: u32, expected: usize, reported: usize },
    #[error("Decoder could not read attribute {id} as {shape} of {component}")]
    AttributeRead { id: u32, component: ComponentType, shape: AttributeShape },
    #[error("Compressed payload of {len} bytes is smaller than {min} bytes", min = MIN_BLOB_LEN)]
    BlobTooSmall { len: usize },
    #[error("Decoder failed to decode the compressed payload")]
    Decode,
    #[error("Failed to create a decoder instance")]
    DecoderInit,
    #[error("Decoded mesh is empty ({vertex_count} vertices, {index_count} indices)")]
    EmptyMesh { vertex_count: u32, index_count: u32 },
    #[error("Decoder reports {reported} bytes of indices, expected {expected}")]
    IndicesLength { expected: usize, reported: usize },
    #[error("Decoder could not read indices as {0}")]
    IndicesRead(ComponentType),
    #[error("Cannot {operation} in session state {state}")]
    InvalidState { operation: &'static str, state: SessionState },
    #[error("Byte size of a decoded stream overflows")]
    SizeOverflow,
    #[error("Attribute {0} was copied before it was read")]
    UnpreparedAttribute(u32),
}

/// One decoder handle, scoped to the decode of exactly one primitive.
///
/// The handle is released when the session is dropped, so every early
/// return in the caller releases it as well.
pub struct DecodeSession<'d, D: GeometryDecoder + ?Sized> {
    decoder: &'d D,
    handle: Option<D::Handle>,
    state: SessionState,
    vertex_count: u32,
    index_count: u32,
    /// the attribute prepared by the last successful `read_attribute`
    prepared: Option<(u32, ComponentType, AttributeShape)>,
    index_type: Option<ComponentType>,
}

impl<'d, D> DecodeSession<'d, D>
    where D: GeometryDecoder + ?Sized
{
    pub fn create(decoder: &'d D) -> Result<Self, Err> {
        let handle = decoder.create().ok_or(Err::DecoderInit)?;
        Ok(Self {
            decoder,
            handle: Some(handle),
            state: SessionState::Created,
            vertex_count: 0,
            index_count: 0,
            prepared: None,
            index_type: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn decode(&mut self, blob: &[u8]) -> Result<(), Err> {
        self.expect_state("decode", &[SessionState::Created])?;
        if blob.len() < MIN_BLOB_LEN {
            return Err(Err::BlobTooSmall { len: blob.len() });
        }

        let decoder = self.decoder;
        let handle = self.handle_mut("decode")?;
        if !decoder.decode(handle, blob) {
            return Err(Err::Decode);
        }
        let vertex_count = decoder.vertex_count(handle);
        let index_count = decoder.index_count(handle);
        if vertex_count == 0 || index_count == 0 {
            return Err(Err::EmptyMesh { vertex_count, index_count });
        }

        self.vertex_count = vertex_count;
        self.index_count = index_count;
        self.state = SessionState::BlobDecoded;
        Ok(())
    }

    pub fn read_attribute(&mut self, id: u32, component: ComponentType, shape: AttributeShape) -> Result<(), Err> {
        self.expect_state("read an attribute", &[SessionState::BlobDecoded, SessionState::AttributeRead])?;
        let decoder = self.decoder;
        self.prepared = None;
        let handle = self.handle_mut("read an attribute")?;
        if !decoder.read_attribute(handle, id, component, shape) {
            return Err(Err::AttributeRead { id, component, shape });
        }
        self.prepared = Some((id, component, shape));
        self.state = SessionState::AttributeRead;
        Ok(())
    }

    /// Copies the attribute prepared by the last `read_attribute` into a
    /// buffer of exactly `components × vertex_count × component_size` bytes.
    pub fn copy_attribute(&mut self, id: u32) -> Result<Vec<u8>, Err> {
        self.expect_state("copy an attribute", &[SessionState::AttributeRead])?;
        let (component, shape) = match self.prepared {
            Some((prepared_id, component, shape)) if prepared_id == id => (component, shape),
            _ => return Err(Err::UnpreparedAttribute(id)),
        };
        let expected = (self.vertex_count as usize)
            .checked_mul(shape.num_components())
            .and_then(|n| n.checked_mul(component.size()))
            .ok_or(Err::SizeOverflow)?;

        let decoder = self.decoder;
        let handle = self.handle_mut("copy an attribute")?;
        let reported = decoder.attribute_byte_length(handle, id);
        if reported != expected {
            return Err(Err::AttributeLength { id, expected, reported });
        }
        let mut out = vec![0u8; expected];
        decoder.copy_attribute(handle, id, &mut out);
        Ok(out)
    }

    /// `read_attribute` followed by `copy_attribute`.
    pub fn fetch_attribute(&mut self, id: u32, component: ComponentType, shape: AttributeShape) -> Result<Vec<u8>, Err> {
        self.read_attribute(id, component, shape)?;
        self.copy_attribute(id)
    }

    pub fn read_indices(&mut self, component: ComponentType) -> Result<(), Err> {
        self.expect_state("read indices", &[SessionState::BlobDecoded, SessionState::AttributeRead])?;
        if component == ComponentType::F32 {
            return Err(Err::IndicesRead(component));
        }
        let decoder = self.decoder;
        let handle = self.handle_mut("read indices")?;
        if !decoder.read_indices(handle, component) {
            return Err(Err::IndicesRead(component));
        }
        self.index_type = Some(component);
        self.state = SessionState::IndicesRead;
        Ok(())
    }

    pub fn copy_indices(&mut self) -> Result<Vec<u8>, Err> {
        self.expect_state("copy indices", &[SessionState::IndicesRead])?;
        let component = self.index_type.ok_or(Err::InvalidState {
            operation: "copy indices",
            state: self.state,
        })?;
        let expected = (self.index_count as usize)
            .checked_mul(component.size())
            .ok_or(Err::SizeOverflow)?;

        let decoder = self.decoder;
        let handle = self.handle_mut("copy indices")?;
        let reported = decoder.indices_byte_length(handle);
        if reported != expected {
            return Err(Err::IndicesLength { expected, reported });
        }
        let mut out = vec![0u8; expected];
        decoder.copy_indices(handle, &mut out);
        Ok(out)
    }

    /// Releases the handle now instead of at the end of the scope.
    pub fn release(mut self) {
        self.release_handle();
    }

    fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.decoder.release(handle);
            self.state = SessionState::Released;
        }
    }

    fn handle_mut(&mut self, operation: &'static str) -> Result<&mut D::Handle, Err> {
        let state = self.state;
        self.handle.as_mut().ok_or(Err::InvalidState { operation, state })
    }

    fn expect_state(&self, operation: &'static str, allowed: &[SessionState]) -> Result<(), Err> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Err::InvalidState { operation, state: self.state })
        }
    }
}

impl<D> Drop for DecodeSession<'_, D>
    where D: GeometryDecoder + ?Sized
{
    fn drop(&mut self) {
        self.release_handle();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::mock::{MockDecoder, MockMesh};

    fn decoder() -> MockDecoder {
        MockDecoder::new().with_mesh(
            1,
            MockMesh::new(3)
                .with_f32(0, AttributeShape::Vec3, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
                .with_indices(vec![0, 1, 2]),
        )
    }

    #[test]
    fn full_lifecycle() {
        let dec = decoder();
        {
            let mut session = DecodeSession::create(&dec).unwrap();
            session.decode(&MockDecoder::blob(1)).unwrap();
            assert_eq!(session.state(), SessionState::BlobDecoded);
            assert_eq!((session.vertex_count(), session.index_count()), (3, 3));

            let bytes = session.fetch_attribute(0, ComponentType::F32, AttributeShape::Vec3).unwrap();
            assert_eq!(bytes.len(), 36);

            session.read_indices(ComponentType::U16).unwrap();
            assert_eq!(session.copy_indices().unwrap(), vec![0, 0, 1, 0, 2, 0]);
            assert_eq!(session.state(), SessionState::IndicesRead);
        }
        assert_eq!(dec.created(), 1);
        assert_eq!(dec.released(), 1);
    }

    #[test]
    fn released_after_failure() {
        let dec = decoder();
        {
            let mut session = DecodeSession::create(&dec).unwrap();
            assert_eq!(session.decode(&MockDecoder::blob(9)).unwrap_err(), Err::Decode);
        }
        assert_eq!(dec.live_handles(), 0);

        {
            let mut session = DecodeSession::create(&dec).unwrap();
            session.decode(&MockDecoder::blob(1)).unwrap();
            // attribute 5 does not exist
            assert!(matches!(
                session.fetch_attribute(5, ComponentType::F32, AttributeShape::Vec3),
                Err(Err::AttributeRead { id: 5, .. })
            ));
        }
        assert_eq!(dec.created(), 2);
        assert_eq!(dec.live_handles(), 0);
    }

    #[test]
    fn explicit_release_happens_once() {
        let dec = decoder();
        let session = DecodeSession::create(&dec).unwrap();
        session.release();
        assert_eq!(dec.released(), 1);
    }

    #[test]
    fn small_blob() {
        let dec = decoder();
        let mut session = DecodeSession::create(&dec).unwrap();
        assert_eq!(session.decode(&[1; 31]).unwrap_err(), Err::BlobTooSmall { len: 31 });
        assert_eq!(dec.decode_calls(), 0);
    }

    #[test]
    fn empty_mesh() {
        let dec = MockDecoder::new().with_mesh(2, MockMesh::new(0).with_indices(vec![]));
        let mut session = DecodeSession::create(&dec).unwrap();
        assert_eq!(
            session.decode(&MockDecoder::blob(2)).unwrap_err(),
            Err::EmptyMesh { vertex_count: 0, index_count: 0 }
        );
    }

    #[test]
    fn init_failure() {
        let dec = decoder().failing_create();
        assert_eq!(DecodeSession::create(&dec).err(), Some(Err::DecoderInit));
        assert_eq!(dec.released(), 0);
    }

    #[test]
    fn enforces_order() {
        let dec = decoder();
        let mut session = DecodeSession::create(&dec).unwrap();
        assert!(matches!(
            session.read_indices(ComponentType::U32),
            Err(Err::InvalidState { state: SessionState::Created, .. })
        ));
        session.decode(&MockDecoder::blob(1)).unwrap();
        assert_eq!(session.copy_attribute(0).unwrap_err(), Err::InvalidState {
            operation: "copy an attribute",
            state: SessionState::BlobDecoded,
        });
        session.read_indices(ComponentType::U32).unwrap();
        assert!(session.read_attribute(0, ComponentType::F32, AttributeShape::Vec3).is_err());
    }

    #[test]
    fn reported_length_must_match() {
        // two floats per vertex instead of three
        let dec = MockDecoder::new().with_mesh(
            3,
            MockMesh::new(2)
                .with_raw(0, ComponentType::F32, AttributeShape::Vec3, vec![0; 16])
                .with_indices(vec![0, 1, 1]),
        );
        let mut session = DecodeSession::create(&dec).unwrap();
        session.decode(&MockDecoder::blob(3)).unwrap();
        assert_eq!(
            session.fetch_attribute(0, ComponentType::F32, AttributeShape::Vec3).unwrap_err(),
            Err::AttributeLength { id: 0, expected: 24, reported: 16 }
        );
    }

    #[test]
    fn float_indices_are_rejected() {
        let dec = decoder();
        let mut session = DecodeSession::create(&dec).unwrap();
        session.decode(&MockDecoder::blob(1)).unwrap();
        assert_eq!(session.read_indices(ComponentType::F32).unwrap_err(), Err::IndicesRead(ComponentType::F32));
    }
}
