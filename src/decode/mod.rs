//! Decoding of compressed primitives and their assembly into meshes.
//!
//! [`decode_primitive`] turns one compressed primitive into a
//! [`DecodedPrimitive`]; [`decode_mesh`] does this for every primitive of a
//! mesh and applies the configured [`FailurePolicy`].

pub mod descriptor;
pub mod normalizer;
pub mod primitive;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use descriptor::{MeshDescriptor, PrimitiveDescriptor};
pub use primitive::decode_primitive;

use crate::core::attribute;
use crate::core::buffer;
use crate::core::buffer::BufferSource;
use crate::core::mesh::aggregator::{self, MeshAggregator};
use crate::core::mesh::builder;
use crate::core::mesh::{DecodedPrimitive, MeshAggregate};
use crate::core::shared::{ComponentType, ConfigType};
use session::GeometryDecoder;

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// What happens to the rest of a mesh when one of its primitives fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure and leave the primitive out of the mesh.
    #[default]
    SkipPrimitive,
    /// Discard the whole mesh.
    AbortMesh,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub failure_policy: FailurePolicy,
    /// Width the decoder is asked to produce indices in. When unset, the
    /// indices accessor's component type is used, then 32-bit.
    pub index_component_type: Option<ComponentType>,
    /// Decode the primitives of a mesh on scoped threads.
    pub parallel: bool,
    /// Upper bound on decoder threads per mesh. Defaults to the available
    /// parallelism of the machine.
    pub max_workers: Option<usize>,
}

impl ConfigType for Config {
    fn default() -> Self {
        Config {
            failure_policy: FailurePolicy::SkipPrimitive,
            index_component_type: None,
            parallel: false,
            max_workers: None,
        }
    }
}

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
    #[error(transparent)]
    Aggregate(#[from] aggregator::Err),
    #[error(transparent)]
    Attribute(#[from] attribute::Err),
    #[error(transparent)]
    Buffer(#[from] buffer::Err),
    #[error(transparent)]
    Descriptor(#[from] descriptor::Err),
    #[error(transparent)]
    Normalize(#[from] normalizer::Err),
    #[error(transparent)]
    Session(#[from] session::Err),
    #[error(transparent)]
    Validation(#[from] builder::Err),
    #[error("Decoder thread panicked")]
    WorkerPanicked,
}

/// Coarse classification of a primitive failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Range,
    MissingKey,
    DuplicateId,
    MissingAttribute,
    DecoderInit,
    BlobTooSmall,
    Decode,
    EmptyMesh,
    AttributeRead,
    Validation,
    Document,
}

impl Err {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Err::Aggregate(_) | Err::Validation(_) | Err::WorkerPanicked => ErrorKind::Validation,
            Err::Attribute(err) => match err {
                attribute::Err::DuplicateId { .. } => ErrorKind::DuplicateId,
                attribute::Err::IdOutOfRange { .. } => ErrorKind::Range,
                attribute::Err::MissingAttribute(_) => ErrorKind::MissingAttribute,
            },
            Err::Buffer(_) => ErrorKind::Range,
            Err::Descriptor(_) => ErrorKind::MissingKey,
            Err::Normalize(err) => match err {
                normalizer::Err::ByteLength { .. }
                | normalizer::Err::LengthOverflow { .. }
                | normalizer::Err::UnsupportedIndexType(_) => ErrorKind::AttributeRead,
                normalizer::Err::IndexOverflow { .. } => ErrorKind::Validation,
            },
            Err::Session(err) => match err {
                session::Err::BlobTooSmall { .. } => ErrorKind::BlobTooSmall,
                session::Err::Decode => ErrorKind::Decode,
                session::Err::DecoderInit => ErrorKind::DecoderInit,
                session::Err::EmptyMesh { .. } => ErrorKind::EmptyMesh,
                _ => ErrorKind::AttributeRead,
            },
        }
    }
}

/// A primitive that failed, with its position in the mesh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Primitive {primitive_index} of mesh '{mesh_name}': {error}")]
pub struct PrimitiveFailure {
    pub mesh_name: String,
    pub primitive_index: usize,
    #[source]
    pub error: Err,
}

/// A mesh that survived its failure policy.
#[derive(Debug)]
pub struct MeshOutcome {
    pub aggregate: MeshAggregate,
    /// primitives left out under [`FailurePolicy::SkipPrimitive`]
    pub skipped: Vec<PrimitiveFailure>,
}

/// Decodes every primitive of `mesh` and aggregates the results in
/// declaration order.
///
/// Under [`FailurePolicy::AbortMesh`] the first failure in declaration order
/// is returned and no aggregate is produced. Under
/// [`FailurePolicy::SkipPrimitive`] failures are collected in
/// [`MeshOutcome::skipped`]; a mesh whose primitives all fail still yields an
/// empty aggregate.
pub fn decode_mesh<S, D>(
    source: &S,
    mesh: MeshDescriptor,
    decoder: &D,
    cfg: &Config,
) -> Result<MeshOutcome, PrimitiveFailure>
    where
        S: BufferSource + Sync + ?Sized,
        D: GeometryDecoder + Sync + ?Sized,
{
    let _span = tracing::info_span!("decode_mesh", mesh = %mesh.name, primitives = mesh.primitives.len()).entered();

    let MeshDescriptor { name, target_names, primitives } = mesh;
    let mut aggregator = MeshAggregator::begin(name).with_target_names(target_names);
    let mut skipped = Vec::new();

    let mut accept = |primitive_index: usize, result: Result<DecodedPrimitive, Err>| -> Result<(), PrimitiveFailure> {
        let error = match result.and_then(|p| aggregator.append(p).map_err(Err::from)) {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };
        let failure = PrimitiveFailure {
            mesh_name: aggregator.get_name().to_owned(),
            primitive_index,
            error,
        };
        match cfg.failure_policy {
            FailurePolicy::SkipPrimitive => {
                tracing::warn!(primitive = primitive_index, kind = ?failure.error.kind(), error = %failure.error, "skipping primitive");
                skipped.push(failure);
                Ok(())
            }
            FailurePolicy::AbortMesh => {
                tracing::warn!(primitive = primitive_index, kind = ?failure.error.kind(), error = %failure.error, "aborting mesh");
                Err(failure)
            }
        }
    };

    if cfg.parallel && primitives.len() > 1 {
        let results = decode_all_parallel(source, primitives, decoder, cfg);
        for (index, result) in results.into_iter().enumerate() {
            accept(index, result)?;
        }
    } else {
        for (index, descriptor) in primitives.into_iter().enumerate() {
            let result = descriptor.and_then(|d| decode_primitive(source, &d, decoder, cfg));
            accept(index, result)?;
        }
    }

    let aggregate = aggregator.finalize();
    tracing::debug!(surfaces = aggregate.len(), skipped = skipped.len(), "mesh assembled");
    Ok(MeshOutcome { aggregate, skipped })
}

/// Decodes the primitives on a bounded set of scoped threads. Each worker
/// claims the next undecoded index until none are left; the calling thread
/// works too. Results come back in declaration order regardless of
/// completion order.
fn decode_all_parallel<S, D>(
    source: &S,
    primitives: Vec<Result<PrimitiveDescriptor, Err>>,
    decoder: &D,
    cfg: &Config,
) -> Vec<Result<DecodedPrimitive, Err>>
    where
        S: BufferSource + Sync + ?Sized,
        D: GeometryDecoder + Sync + ?Sized,
{
    let workers = worker_count(cfg, primitives.len());
    let next = AtomicUsize::new(0);
    let slots: Vec<OnceLock<Result<DecodedPrimitive, Err>>> = primitives.iter().map(|_| OnceLock::new()).collect();
    let span = tracing::Span::current();

    let work = || {
        let _entered = span.enter();
        loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(descriptor) = primitives.get(index) else {
                break;
            };
            let result = match descriptor {
                Ok(descriptor) => decode_primitive(source, descriptor, decoder, cfg),
                Err(err) => Err(err.clone()),
            };
            let _ = slots[index].set(result);
        }
    };

    tracing::debug!(workers, primitives = primitives.len(), "decoding in parallel");
    std::thread::scope(|scope| {
        let handles: Vec<_> = (1..workers)
            .filter_map(|worker| {
                std::thread::Builder::new()
                    .name(format!("draco-decode-{}", worker))
                    .spawn_scoped(scope, &work)
                    .map_err(|err| tracing::warn!(worker, %err, "could not spawn decoder thread"))
                    .ok()
            })
            .collect();
        work();
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("decoder thread panicked");
            }
        }
    });

    slots.into_iter()
        .map(|slot| slot.into_inner().unwrap_or(Err(Err::WorkerPanicked)))
        .collect()
}

fn worker_count(cfg: &Config, primitives: usize) -> usize {
    let limit = cfg.max_workers.unwrap_or_else(|| {
        std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
    });
    limit.min(primitives).max(1)
}
