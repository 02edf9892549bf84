use indexmap::IndexMap;

use crate::core::shared::{AttributeShape, ComponentType};


#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Err {
	/// Two semantically distinct attributes alias the same on-wire id.
	#[error("Attribute id {id} is assigned to both {first:?} and {second:?}")]
	DuplicateId {
		id: u32,
		first: AttributeType,
		second: AttributeType,
	},
	#[error("Attribute id {id} of {att_type:?} does not fit in 32 bits")]
	IdOutOfRange { att_type: AttributeType, id: i64 },
	/// Position and indices must always be present.
	#[error("Required attribute {0:?} is missing")]
	MissingAttribute(AttributeType),
}

/// The semantic of a decoded stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
	Position,
	Normal,
	TextureCoordinate,
	Joint,
	Weight,
	Indices,
}

impl AttributeType {
	/// The key under which the attribute appears in a glTF primitive.
	pub fn gltf_name(self) -> &'static str {
		match self {
			AttributeType::Position => "POSITION",
			AttributeType::Normal => "NORMAL",
			AttributeType::TextureCoordinate => "TEXCOORD_0",
			AttributeType::Joint => "JOINTS_0",
			AttributeType::Weight => "WEIGHTS_0",
			AttributeType::Indices => "indices",
		}
	}

	/// The component type the decoder is asked to produce for this attribute.
	/// Indices are configurable and report their default width here.
	pub fn component_type(self) -> ComponentType {
		match self {
			AttributeType::Joint => ComponentType::U16,
			AttributeType::Indices => ComponentType::U32,
			_ => ComponentType::F32,
		}
	}

	pub fn shape(self) -> AttributeShape {
		match self {
			AttributeType::Position | AttributeType::Normal => AttributeShape::Vec3,
			AttributeType::TextureCoordinate => AttributeShape::Vec2,
			AttributeType::Joint | AttributeType::Weight => AttributeShape::Vec4,
			AttributeType::Indices => AttributeShape::Scalar,
		}
	}

	pub fn is_required(self) -> bool {
		matches!(self, AttributeType::Position | AttributeType::Indices)
	}
}

/// On-wire attribute ids of one compressed primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeIdMap {
	pub position: u32,
	pub normal: Option<u32>,
	pub tex_coord: Option<u32>,
	pub joints: Option<u32>,
	pub weights: Option<u32>,
	pub indices: u32,
}

impl AttributeIdMap {
	/// Builds the map from the signed form used by document models, where a
	/// negative id means "absent". The result is validated.
	pub fn from_raw(
		position: i64,
		normal: i64,
		tex_coord: i64,
		joints: i64,
		weights: i64,
		indices: i64,
	) -> Result<Self, Err> {
		let position = optional_id(AttributeType::Position, position)?
			.ok_or(Err::MissingAttribute(AttributeType::Position))?;
		let indices = optional_id(AttributeType::Indices, indices)?
			.ok_or(Err::MissingAttribute(AttributeType::Indices))?;
		let map = Self {
			position,
			normal: optional_id(AttributeType::Normal, normal)?,
			tex_coord: optional_id(AttributeType::TextureCoordinate, tex_coord)?,
			joints: optional_id(AttributeType::Joint, joints)?,
			weights: optional_id(AttributeType::Weight, weights)?,
			indices,
		};
		AttributeIdSet::validate(&map)?;
		Ok(map)
	}

	pub fn get(&self, att_type: AttributeType) -> Option<u32> {
		match att_type {
			AttributeType::Position => Some(self.position),
			AttributeType::Normal => self.normal,
			AttributeType::TextureCoordinate => self.tex_coord,
			AttributeType::Joint => self.joints,
			AttributeType::Weight => self.weights,
			AttributeType::Indices => Some(self.indices),
		}
	}

	/// Iterates over the present ids in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (AttributeType, u32)> + '_ {
		[
			AttributeType::Position,
			AttributeType::Normal,
			AttributeType::TextureCoordinate,
			AttributeType::Joint,
			AttributeType::Weight,
			AttributeType::Indices,
		]
			.into_iter()
			.filter_map(|ty| self.get(ty).map(|id| (ty, id)))
	}
}

fn optional_id(att_type: AttributeType, raw: i64) -> Result<Option<u32>, Err> {
	if raw < 0 {
		return Ok(None);
	}
	u32::try_from(raw)
		.map(Some)
		.map_err(|_| Err::IdOutOfRange { att_type, id: raw })
}

/// The set of ids claimed by one primitive. Constructed only through
/// [`AttributeIdSet::validate`], so an existing set is always alias-free.
#[derive(Clone, Debug)]
pub struct AttributeIdSet {
	ids: IndexMap<u32, AttributeType>,
}

impl AttributeIdSet {
	/// The indices id names a document accessor, not a decoder attribute, so
	/// it is only required to be present and never takes part in the check.
	pub fn validate(map: &AttributeIdMap) -> Result<Self, Err> {
		let mut ids = IndexMap::new();
		for (att_type, id) in map.iter().filter(|(ty, _)| *ty != AttributeType::Indices) {
			if let Some(&first) = ids.get(&id) {
				return Err(Err::DuplicateId { id, first, second: att_type });
			}
			ids.insert(id, att_type);
		}
		Ok(Self { ids })
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn semantic_of(&self, id: u32) -> Option<AttributeType> {
		self.ids.get(&id).copied()
	}
}
