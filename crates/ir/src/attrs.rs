//! Instruction, parameter, and function attributes.

use tv_smtlib::RoundingMode;

// ---------------------------------------------------------------------------
// Fast-math flags
// ---------------------------------------------------------------------------

/// Fast-math flag set, stored as a bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastMathFlags(u8);

impl FastMathFlags {
    pub const NNAN: FastMathFlags = FastMathFlags(1 << 0);
    pub const NINF: FastMathFlags = FastMathFlags(1 << 1);
    pub const NSZ: FastMathFlags = FastMathFlags(1 << 2);
    pub const ARCP: FastMathFlags = FastMathFlags(1 << 3);
    pub const CONTRACT: FastMathFlags = FastMathFlags(1 << 4);
    pub const REASSOC: FastMathFlags = FastMathFlags(1 << 5);
    pub const AFN: FastMathFlags = FastMathFlags(1 << 6);

    pub const fn none() -> Self {
        FastMathFlags(0)
    }

    /// All flags, i.e. `fast`.
    pub const fn fast() -> Self {
        FastMathFlags(0x7f)
    }

    pub const fn union(self, other: FastMathFlags) -> Self {
        FastMathFlags(self.0 | other.0)
    }

    pub fn contains(self, flag: FastMathFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flags that are encoded as unsound value rewrites rather than extra
    /// poison, and therefore mark the encoding as approximate.
    pub fn has_approx_flags(self) -> bool {
        self.contains(Self::ARCP)
            || self.contains(Self::CONTRACT)
            || self.contains(Self::REASSOC)
            || self.contains(Self::AFN)
    }
}

impl std::fmt::Display for FastMathFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::fast() {
            return write!(f, "fast ");
        }
        for (flag, name) in [
            (Self::NNAN, "nnan"),
            (Self::NINF, "ninf"),
            (Self::NSZ, "nsz"),
            (Self::ARCP, "arcp"),
            (Self::CONTRACT, "contract"),
            (Self::REASSOC, "reassoc"),
            (Self::AFN, "afn"),
        ] {
            if self.contains(flag) {
                write!(f, "{name} ")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FP environment
// ---------------------------------------------------------------------------

/// Rounding-mode operand of a constrained FP operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FpRounding {
    /// No constrained semantics: round to nearest even, no side conditions.
    #[default]
    Default,
    /// Round according to the dynamic rounding-mode register.
    Dynamic,
    /// A fixed mode; non-poison additionally requires the dynamic register
    /// to agree.
    Fixed(RoundingMode),
}

/// Exception-behavior operand of a constrained FP operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FpExceptions {
    #[default]
    Ignore,
    MayTrap,
    Strict,
}

/// How the target treats denormal inputs and outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FpDenormalKind {
    /// Denormals pass through untouched.
    #[default]
    Ieee,
    /// Denormals are flushed to `+0.0`.
    PositiveZero,
    /// Denormals are flushed to a zero carrying the input's sign.
    PreserveSign,
}

// ---------------------------------------------------------------------------
// Parameter attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamAttrs {
    pub nonnull: bool,
    pub noundef: bool,
    pub nocapture: bool,
    /// The call returns this argument.
    pub returned: bool,
    /// Guaranteed dereferenceable byte count.
    pub dereferenceable: Option<u64>,
    pub align: Option<u64>,
}

impl ParamAttrs {
    pub fn is_empty(&self) -> bool {
        *self == ParamAttrs::default()
    }
}

// ---------------------------------------------------------------------------
// Function attributes
// ---------------------------------------------------------------------------

/// Which allocation-family member a callee is, per its allocation attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocKind {
    /// Fresh allocation; `zeroed` for `calloc`-likes.
    Alloc { zeroed: bool },
    /// Reallocation. `free_always` marks `reallocf`-style callees that
    /// release the old block even on failure.
    Realloc { free_always: bool },
    /// Deallocation.
    Free,
}

/// Allocation description: the kind plus which argument(s) carry the size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocSpec {
    pub kind: AllocKind,
    /// Index of the size argument.
    pub size_arg: usize,
    /// Optional second argument multiplied into the size (`calloc`).
    pub count_arg: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FnAttrs {
    pub no_read: bool,
    pub no_write: bool,
    pub arg_mem_only: bool,
    pub no_free: bool,
    pub no_return: bool,
    pub will_return: bool,
    /// Return value cannot be poison/undef.
    pub ret_noundef: bool,
    pub ret_nonnull: bool,
    pub alloc: Option<AllocSpec>,
    /// Denormal handling for FP operations in this function.
    pub denormal: FpDenormalKind,
}

impl FnAttrs {
    /// The call cannot observe or mutate state the encoder tracks, so two
    /// calls with equal inputs return equal outputs.
    pub fn is_pure(&self) -> bool {
        self.no_read && self.no_write
    }
}
