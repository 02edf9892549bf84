use serde::Deserialize;


#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
	#[error("Buffer {index} holds {loaded} bytes but declares byteLength {declared}")]
	BufferLengthMismatch { index: usize, declared: usize, loaded: usize },
	#[error("Buffer {index} is declared but its bytes were never loaded")]
	BufferNotLoaded { index: usize },
	#[error("Buffer index {index} is out of range ({count} buffers)")]
	BufferOutOfRange { index: usize, count: usize },
	#[error("BufferView index {index} is out of range ({count} buffer views)")]
	BufferViewOutOfRange { index: usize, count: usize },
	#[error("BufferView range {offset}..{offset}+{length} overruns the buffer of {size} bytes")]
	RegionOverrun { offset: usize, length: usize, size: usize },
}

/// A byte range within one of the document's binary buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct BufferView {
	#[serde(rename = "buffer")]
	pub buffer_index: usize,
	#[serde(rename = "byteOffset", default)]
	pub byte_offset: usize,
	#[serde(rename = "byteLength")]
	pub byte_length: usize,
}

/// The buffer-loading capability of a document model.
pub trait BufferSource {
	fn buffer_view_count(&self) -> usize;

	fn buffer_view(&self, index: usize) -> Option<BufferView>;

	fn buffer_count(&self) -> usize;

	/// The `byteLength` the document declares for the buffer.
	fn declared_buffer_len(&self, index: usize) -> Option<usize>;

	/// The loaded bytes of the buffer, if it is available.
	fn buffer(&self, index: usize) -> Option<&[u8]>;
}

/// Resolves buffer-view indices into the exact compressed byte region.
/// The resolver never copies: the returned slice borrows the source.
pub struct BufferRegionResolver<'a, S: ?Sized> {
	source: &'a S,
}

impl<'a, S> BufferRegionResolver<'a, S>
	where S: BufferSource + ?Sized
{
	pub fn new(source: &'a S) -> Self {
		Self { source }
	}

	pub fn resolve(&self, buffer_view_index: usize) -> Result<&'a [u8], Err> {
		let view = self.source.buffer_view(buffer_view_index)
			.ok_or(Err::BufferViewOutOfRange {
				index: buffer_view_index,
				count: self.source.buffer_view_count(),
			})?;

		let buffer = self.loaded_buffer(view.buffer_index)?;

		let overrun = Err::RegionOverrun {
			offset: view.byte_offset,
			length: view.byte_length,
			size: buffer.len(),
		};
		let end = view.byte_offset.checked_add(view.byte_length).ok_or(overrun.clone())?;
		if end > buffer.len() {
			return Err(overrun);
		}
		let region = &buffer[view.byte_offset..end];

		tracing::trace!(
			buffer_view = buffer_view_index,
			buffer = view.buffer_index,
			offset = view.byte_offset,
			length = view.byte_length,
			"resolved buffer region"
		);
		Ok(region)
	}

	/// The loaded bytes of a buffer, cut to its declared length. Loaded data
	/// may run past `byteLength` (GLB chunk padding) but never fall short of it.
	fn loaded_buffer(&self, index: usize) -> Result<&'a [u8], Err> {
		let count = self.source.buffer_count();
		if index >= count {
			return Err(Err::BufferOutOfRange { index, count });
		}
		let bytes = self.source.buffer(index).ok_or(Err::BufferNotLoaded { index })?;
		match self.source.declared_buffer_len(index) {
			Some(declared) if bytes.len() < declared => Err(Err::BufferLengthMismatch {
				index,
				declared,
				loaded: bytes.len(),
			}),
			Some(declared) => Ok(&bytes[..declared]),
			None => Ok(bytes),
		}
	}
}
