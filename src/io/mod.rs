/// glTF documents carrying `KHR_draco_mesh_compression` primitives.
pub mod gltf;
