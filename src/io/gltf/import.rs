use crate::core::material::MaterialTable;
use crate::core::mesh::MeshTable;
use crate::core::shared::ConfigType;
use crate::decode::session::GeometryDecoder;
use crate::decode::{self, decode_mesh, PrimitiveFailure};
use super::document::{self, Document};

#[derive(Clone, Debug)]
pub struct Config {
    pub decode: decode::Config,
    /// Skip documents whose `extensionsUsed` does not name the compression
    /// extension, without looking at their meshes.
    pub require_extension_declared: bool,
}

impl ConfigType for Config {
    fn default() -> Self {
        Config {
            decode: decode::Config::default(),
            require_extension_declared: true,
        }
    }
}

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
    #[error("Mesh discarded: {0}")]
    Aborted(#[from] PrimitiveFailure),
    #[error("Mesh could not be described: {0}")]
    Document(#[from] document::Err),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preflight {
    Proceed,
    Skip,
}

#[derive(Debug)]
pub struct ImportReport {
    pub preflight: Preflight,
    /// indices of the meshes written into the mesh table
    pub imported_meshes: Vec<usize>,
    pub decoded_primitives: usize,
    pub skipped_primitives: Vec<PrimitiveFailure>,
    pub failed_meshes: Vec<(usize, Err)>,
}

impl ImportReport {
    fn new(preflight: Preflight) -> Self {
        Self {
            preflight,
            imported_meshes: Vec::new(),
            decoded_primitives: 0,
            skipped_primitives: Vec::new(),
            failed_meshes: Vec::new(),
        }
    }
}

pub fn preflight(document: &Document, cfg: &Config) -> Preflight {
    if !cfg.require_extension_declared || document.uses_compression() {
        Preflight::Proceed
    } else {
        Preflight::Skip
    }
}

/// Decodes every mesh of `document` that has at least one compressed
/// primitive and writes it into `meshes` under its document index.
///
/// Meshes without compressed primitives are not touched. A mesh discarded by
/// [`decode::FailurePolicy::AbortMesh`] is reported and not written.
pub fn import_document<D, T, U>(
    document: &Document,
    decoder: &D,
    materials: &T,
    meshes: &mut U,
    cfg: &Config,
) -> ImportReport
    where
        D: GeometryDecoder + Sync + ?Sized,
        T: MaterialTable + ?Sized,
        U: MeshTable<T::Material> + ?Sized,
{
    let _span = tracing::info_span!("import_document", meshes = document.mesh_count()).entered();

    let mut report = ImportReport::new(preflight(document, cfg));
    if report.preflight == Preflight::Skip {
        tracing::info!("document does not declare the compression extension, skipping");
        return report;
    }

    for mesh_index in 0..document.mesh_count() {
        if !document.has_compressed_primitive(mesh_index) {
            tracing::debug!(mesh = mesh_index, "no compressed primitives, left untouched");
            continue;
        }

        let descriptor = match document.mesh_descriptor(mesh_index) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::warn!(mesh = mesh_index, %err, "mesh could not be described");
                report.failed_meshes.push((mesh_index, err.into()));
                continue;
            }
        };

        match decode_mesh(document, descriptor, decoder, &cfg.decode) {
            Ok(outcome) => {
                report.decoded_primitives += outcome.aggregate.len();
                report.skipped_primitives.extend(outcome.skipped);
                meshes.set_mesh(mesh_index, outcome.aggregate.into_imported(materials));
                report.imported_meshes.push(mesh_index);
            }
            Err(failure) => report.failed_meshes.push((mesh_index, failure.into())),
        }
    }

    tracing::info!(
        imported = report.imported_meshes.len(),
        decoded = report.decoded_primitives,
        skipped = report.skipped_primitives.len(),
        failed = report.failed_meshes.len(),
        "import finished"
    );
    report
}
