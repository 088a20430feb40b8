/// SMT-LIB sort (type) representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    /// Boolean sort
    Bool,
    /// Fixed-width bitvector: `(_ BitVec n)`
    BitVec(u32),
    /// IEEE 754 floating-point: `(_ FloatingPoint e s)`
    Float(u32, u32),
    /// The `RoundingMode` sort of the FP theory
    RoundingMode,
    /// Array sort: `(Array index_sort element_sort)`
    Array(Box<Sort>, Box<Sort>),
    /// Anonymous tuple datatype; the consumer declares one constructor
    /// `tup.mk` with selectors `tup.sel<i>` per arity used
    Tuple(Vec<Sort>),
    /// Uninterpreted sort
    Uninterpreted(String),
}

impl Sort {
    /// Bitvector width, if this is a bitvector sort.
    pub fn bv_width(&self) -> Option<u32> {
        match self {
            Sort::BitVec(w) => Some(*w),
            _ => None,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Sort::Float(..))
    }
}
