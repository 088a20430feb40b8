//! The type model: integers, floats, pointers, vectors, and structs.
//!
//! Type checking is expressed as constraint builders that return [`Term`]s.
//! Types here are always concrete, so every constraint folds to a boolean
//! literal; the uniform interface keeps instruction code free of ad-hoc
//! panics and lets a future inference pass consume symbolic constraints
//! unchanged.

use tv_smtlib::build::{self, and_many, concat_many, extract, pack, unpack};
use tv_smtlib::fpops::FloatFormat;
use tv_smtlib::{Sort, Term};

/// Width of a pointer in bits. A single flat address space.
pub const POINTER_BITS: u32 = 64;

/// Bits per byte.
pub const BITS_PER_BYTE: u32 = 8;

/// A struct member: its type plus whether it is layout padding. Padding
/// members hold no program value and read as poison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    pub ty: Type,
    pub padding: bool,
}

impl StructField {
    pub fn new(ty: Type) -> Self {
        Self { ty, padding: false }
    }

    pub fn padding(bits: u32) -> Self {
        Self {
            ty: Type::Int(bits),
            padding: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int(u32),
    Float(FloatFormat),
    Ptr,
    /// Homogeneous vector: element type and lane count.
    Vector(Box<Type>, u32),
    Struct(Vec<StructField>),
}

impl Type {
    pub fn vec_of(elem: Type, lanes: u32) -> Type {
        Type::Vector(Box::new(elem), lanes)
    }

    /// Total bit width of the value representation.
    pub fn bits(&self) -> u32 {
        match self {
            Type::Void => 0,
            Type::Int(w) => *w,
            Type::Float(fmt) => fmt.total_bits(),
            Type::Ptr => POINTER_BITS,
            Type::Vector(elem, n) => elem.bits() * n,
            Type::Struct(fields) => fields.iter().map(|f| f.ty.bits()).sum(),
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float(_))
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, Type::Ptr)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(..))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Vector(..) | Type::Struct(_))
    }

    /// Number of immediate children of an aggregate; 1 for scalars so that
    /// lane-wise encoders can treat scalars as single-lane.
    pub fn num_children(&self) -> u32 {
        match self {
            Type::Vector(_, n) => *n,
            Type::Struct(fields) => fields.len() as u32,
            _ => 1,
        }
    }

    /// Type of child `i`. For scalars, the type itself.
    pub fn child(&self, i: u32) -> &Type {
        match self {
            Type::Vector(elem, n) => {
                assert!(i < *n, "vector lane out of range");
                elem
            }
            Type::Struct(fields) => &fields[i as usize].ty,
            other => other,
        }
    }

    /// Whether child `i` is layout padding.
    pub fn is_padding(&self, i: u32) -> bool {
        match self {
            Type::Struct(fields) => fields[i as usize].padding,
            _ => false,
        }
    }

    /// Floating-point format, if this is a float type (or vector thereof).
    pub fn float_format(&self) -> Option<FloatFormat> {
        match self {
            Type::Float(fmt) => Some(*fmt),
            Type::Vector(elem, _) => elem.float_format(),
            _ => None,
        }
    }

    /// Scalar width for lane-wise integer work: the width of an element for
    /// vectors, the plain width otherwise.
    pub fn scalar_bits(&self) -> u32 {
        match self {
            Type::Vector(elem, _) => elem.bits(),
            other => other.bits(),
        }
    }

    /// The SMT sort of a value of this type.
    pub fn sort(&self) -> Sort {
        match self {
            Type::Void => Sort::Tuple(vec![]),
            Type::Int(w) => Sort::BitVec(*w),
            Type::Float(fmt) => Sort::Float(fmt.exp_bits, fmt.sig_bits),
            Type::Ptr => Sort::BitVec(POINTER_BITS),
            Type::Vector(elem, n) => Sort::Tuple(vec![elem.sort(); *n as usize]),
            Type::Struct(fields) => {
                Sort::Tuple(fields.iter().map(|f| f.ty.sort()).collect())
            }
        }
    }

    /// The SMT sort of the non-poison component: per-lane booleans for
    /// aggregates, a single boolean for scalars.
    pub fn np_sort(&self) -> Sort {
        match self {
            Type::Vector(_, n) => Sort::Tuple(vec![Sort::Bool; *n as usize]),
            Type::Struct(fields) => {
                Sort::Tuple(fields.iter().map(|f| f.ty.np_sort()).collect())
            }
            _ => Sort::Bool,
        }
    }

    /// A well-defined zero-ish value term, used for padding slots and dummy
    /// lanes.
    pub fn zero_term(&self) -> Term {
        match self {
            Type::Void => pack(vec![]),
            Type::Int(w) => build::bv_zero(*w),
            Type::Float(fmt) => fmt.pos_zero(),
            Type::Ptr => build::bv_zero(POINTER_BITS),
            Type::Vector(elem, n) => pack(vec![elem.zero_term(); *n as usize]),
            Type::Struct(fields) => {
                pack(fields.iter().map(|f| f.ty.zero_term()).collect())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Bit-pattern round trip (bitcast support)
    // -----------------------------------------------------------------------

    /// Flatten a value of this type to a single `bits()`-wide bitvector.
    /// Child 0 occupies the least-significant bits.
    pub fn to_int_term(&self, v: &Term) -> Term {
        match self {
            Type::Void => build::bv_zero(0),
            Type::Int(_) | Type::Ptr => v.clone(),
            Type::Float(_) => Term::FpToIeeeBv(Box::new(v.clone())),
            Type::Vector(..) | Type::Struct(_) => {
                let n = self.num_children();
                // concat_many takes highest-first
                let parts = (0..n)
                    .rev()
                    .map(|i| self.child(i).to_int_term(&unpack(i as usize, v.clone())))
                    .collect();
                concat_many(parts)
            }
        }
    }

    /// Rebuild a value of this type from a `bits()`-wide bitvector.
    pub fn from_int_term(&self, bits: &Term) -> Term {
        match self {
            Type::Void => pack(vec![]),
            Type::Int(_) | Type::Ptr => bits.clone(),
            Type::Float(fmt) => fmt.from_bits(bits.clone()),
            Type::Vector(..) | Type::Struct(_) => {
                let n = self.num_children();
                let mut lanes = Vec::with_capacity(n as usize);
                let mut offset = 0;
                for i in 0..n {
                    let child = self.child(i);
                    let w = child.bits();
                    let piece = extract(offset + w - 1, offset, bits.clone());
                    lanes.push(child.from_int_term(&piece));
                    offset += w;
                }
                pack(lanes)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Typing constraints
    // -----------------------------------------------------------------------

    fn constraint(ok: bool) -> Term {
        Term::BoolLit(ok)
    }

    pub fn enforce_int(&self) -> Term {
        Self::constraint(self.is_int())
    }

    pub fn enforce_int_or_vector_int(&self) -> Term {
        Self::constraint(match self {
            Type::Int(_) => true,
            Type::Vector(elem, _) => elem.is_int(),
            _ => false,
        })
    }

    pub fn enforce_float_or_vector_float(&self) -> Term {
        Self::constraint(match self {
            Type::Float(_) => true,
            Type::Vector(elem, _) => elem.is_float(),
            _ => false,
        })
    }

    pub fn enforce_ptr_or_vector_ptr(&self) -> Term {
        Self::constraint(match self {
            Type::Ptr => true,
            Type::Vector(elem, _) => elem.is_ptr(),
            _ => false,
        })
    }

    pub fn enforce_vector(&self) -> Term {
        Self::constraint(self.is_vector())
    }

    pub fn enforce_same(&self, other: &Type) -> Term {
        Self::constraint(self == other)
    }

    /// Same shape (scalar vs. vector with equal lane count), arbitrary
    /// element types.
    pub fn enforce_same_shape(&self, other: &Type) -> Term {
        Self::constraint(match (self, other) {
            (Type::Vector(_, n), Type::Vector(_, m)) => n == m,
            (Type::Vector(..), _) | (_, Type::Vector(..)) => false,
            _ => true,
        })
    }

    /// Equal total bit width (bitcast legality).
    pub fn enforce_same_bits(&self, other: &Type) -> Term {
        Self::constraint(self.bits() == other.bits())
    }
}

impl Default for Type {
    fn default() -> Self {
        Type::Void
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(w) => write!(f, "i{w}"),
            Type::Float(fmt) => match *fmt {
                FloatFormat::HALF => write!(f, "half"),
                FloatFormat::BFLOAT => write!(f, "bfloat"),
                FloatFormat::FLOAT => write!(f, "float"),
                FloatFormat::DOUBLE => write!(f, "double"),
                FloatFormat::QUAD => write!(f, "fp128"),
                other => write!(f, "fp(e{},s{})", other.exp_bits, other.sig_bits),
            },
            Type::Ptr => write!(f, "ptr"),
            Type::Vector(elem, n) => write!(f, "<{n} x {elem}>"),
            Type::Struct(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if field.padding {
                        write!(f, "pad({})", field.ty.bits())?;
                    } else {
                        write!(f, "{}", field.ty)?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

/// AND of a list of typing constraints.
pub fn all_constraints(cs: Vec<Term>) -> Term {
    and_many(cs)
}
