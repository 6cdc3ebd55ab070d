use crate::sym::{self, SymbolicBit};

/// Fixed-size buffer of symbolic bits. Bit `0` is the least significant bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicBitBuf<const N: usize> {
    bits: [SymbolicBit; N],
}

pub type SymbolicByte = SymbolicBitBuf<8>;

impl<const N: usize> SymbolicBitBuf<N> {
    /// Create a fully symbolic buffer whose bits are the variables
    /// `first_variable..first_variable + N`.
    pub fn with_variables(first_variable: usize) -> Self {
        Self {
            bits: std::array::from_fn(|i| SymbolicBit::Variable(first_variable + i)),
        }
    }

    /// Returns `true` if every bit holds a literal value.
    pub fn is_concrete(&self) -> bool {
        self.bits.iter().all(SymbolicBit::is_literal)
    }
}

impl<const N: usize> Default for SymbolicBitBuf<N> {
    fn default() -> Self {
        Self {
            bits: [sym::FALSE; N],
        }
    }
}

impl<const N: usize> std::ops::Deref for SymbolicBitBuf<N> {
    type Target = [SymbolicBit];

    fn deref(&self) -> &Self::Target {
        &self.bits
    }
}

impl<const N: usize> std::ops::Index<usize> for SymbolicBitBuf<N> {
    type Output = SymbolicBit;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bits[index]
    }
}

impl<const N: usize> std::ops::IndexMut<usize> for SymbolicBitBuf<N> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.bits[index]
    }
}

impl<const N: usize> From<[SymbolicBit; N]> for SymbolicBitBuf<N> {
    fn from(bits: [SymbolicBit; N]) -> Self {
        Self { bits }
    }
}

impl<const N: usize> From<SymbolicBitBuf<N>> for [SymbolicBit; N] {
    fn from(buf: SymbolicBitBuf<N>) -> Self {
        buf.bits
    }
}
