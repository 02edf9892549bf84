pub mod document;
pub mod import;

pub use document::Document;
pub use import::{import_document, ImportReport};

/// Name of the glTF extension carrying compressed primitives.
pub const EXTENSION_NAME: &str = "KHR_draco_mesh_compression";
