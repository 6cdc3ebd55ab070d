use thiserror;

pub const FALSE: SymbolicBit = SymbolicBit::Literal(false);

/// A bit as handed over by the execution engine: either a known literal or an unconstrained
/// variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolicBit {
    /// A literal `true` or `false` value.
    Literal(bool),

    /// A variable value. The parameter is the identifier for this variable. Two variables with the
    /// same identifier are equivalent.
    Variable(usize),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcretizationError {
    /// The bit at this index is not a literal and has no single concrete value.
    #[error("non-literal bit at index {bit_index}")]
    NonLiteralBit { bit_index: usize },

    /// The concrete value does not fit into the requested type.
    #[error("value with {num_bits} bit(s) does not fit in {max_bits} bit(s)")]
    Overflow { num_bits: usize, max_bits: u32 },
}

impl SymbolicBit {
    /// The literal value of this bit, if it has one.
    pub fn literal(&self) -> Option<bool> {
        match self {
            SymbolicBit::Literal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.literal().is_some()
    }
}

/// Little-endian vector of symbolic bits. Bit `0` is the least significant bit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolicBitVec {
    pub(crate) bits: Vec<SymbolicBit>,
}

impl SymbolicBitVec {
    /// Create a fully symbolic value of `num_bits` bits. The bits are assigned consecutive
    /// variable identifiers starting at `first_variable`.
    pub fn with_variables(first_variable: usize, num_bits: usize) -> Self {
        Self {
            bits: (first_variable..first_variable + num_bits)
                .map(SymbolicBit::Variable)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns `true` if every bit holds a literal value.
    pub fn is_concrete(&self) -> bool {
        self.bits.iter().all(SymbolicBit::is_literal)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolicBit> {
        self.bits.iter()
    }
}

impl std::ops::Index<usize> for SymbolicBitVec {
    type Output = SymbolicBit;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bits[index]
    }
}

impl std::ops::IndexMut<usize> for SymbolicBitVec {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.bits[index]
    }
}
