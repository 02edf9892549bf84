use std::fmt;

pub type Vec2f = [f32; 2];
pub type Vec3f = [f32; 3];

/// Configuration objects of the crate. Every config has a sane default that
/// reproduces the behavior of a plain glTF import.
pub trait ConfigType {
    fn default()-> Self;
}

/// The numeric encoding of a single scalar within an attribute or index stream.
/// The discriminants are the accessor component-type codes of glTF, which the
/// external decoder also speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
    U16 = 5123,
    U32 = 5125,
    F32 = 5126,
}

impl ComponentType {
    /// returns the size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }

    /// returns the glTF component-type code.
    pub fn gl_code(self) -> u32 {
        self as u32
    }

    /// Parses a glTF component-type code. Signed and 8-bit codes are not
    /// representable by the decoder contract and yield `None`.
    pub fn from_gl_code(code: u32) -> Option<Self> {
        match code {
            5123 => Some(ComponentType::U16),
            5125 => Some(ComponentType::U32),
            5126 => Some(ComponentType::F32),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentType::U16 => "UNSIGNED_SHORT",
            ComponentType::U32 => "UNSIGNED_INT",
            ComponentType::F32 => "FLOAT",
        };
        write!(f, "{}({})", name, self.gl_code())
    }
}

/// The shape tag handed to the decoder together with the component type,
/// e.g. `Vec3` for positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeShape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
}

impl AttributeShape {
    pub fn num_components(self) -> usize {
        match self {
            AttributeShape::Scalar => 1,
            AttributeShape::Vec2 => 2,
            AttributeShape::Vec3 => 3,
            AttributeShape::Vec4 => 4,
        }
    }

    /// The accessor `type` string used by glTF.
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeShape::Scalar => "SCALAR",
            AttributeShape::Vec2 => "VEC2",
            AttributeShape::Vec3 => "VEC3",
            AttributeShape::Vec4 => "VEC4",
        }
    }
}

impl fmt::Display for AttributeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
