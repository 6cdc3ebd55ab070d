use crate::buf::SymbolicByte;
use crate::sym::{ConcretizationError, SymbolicBit, SymbolicBitVec};

/// Concretize little-endian bits into a `u128`. Fails on the first non-literal bit, or if the
/// value needs more than 128 bits.
pub fn concretize<'a>(
    bits: impl IntoIterator<Item = &'a SymbolicBit>,
) -> Result<u128, ConcretizationError> {
    let mut result = 0u128;
    for (bit_index, bit) in bits.into_iter().enumerate() {
        let is_set = bit
            .literal()
            .ok_or(ConcretizationError::NonLiteralBit { bit_index })?;

        if is_set {
            if bit_index >= u128::BITS as usize {
                return Err(ConcretizationError::Overflow {
                    num_bits: bit_index + 1,
                    max_bits: u128::BITS,
                });
            }

            result |= 1u128 << bit_index;
        }
    }

    Ok(result)
}

fn symbolize(bytes: &[u8]) -> impl Iterator<Item = SymbolicBit> + '_ {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |b| SymbolicBit::Literal((byte & (1 << b)) > 0)))
}

fn significant_bits(value: u128) -> usize {
    (u128::BITS - value.leading_zeros()) as usize
}

macro_rules! impl_concrete {
    ($target:ty) => {
        impl From<$target> for SymbolicBitVec {
            fn from(value: $target) -> Self {
                Self {
                    bits: symbolize(&value.to_le_bytes()).collect(),
                }
            }
        }

        impl TryFrom<&SymbolicBitVec> for $target {
            type Error = ConcretizationError;

            fn try_from(value: &SymbolicBitVec) -> Result<Self, Self::Error> {
                let value = concretize(value.iter())?;
                <$target>::try_from(value).map_err(|_| ConcretizationError::Overflow {
                    num_bits: significant_bits(value),
                    max_bits: <$target>::BITS,
                })
            }
        }

        impl TryFrom<SymbolicBitVec> for $target {
            type Error = ConcretizationError;

            fn try_from(value: SymbolicBitVec) -> Result<Self, Self::Error> {
                <$target>::try_from(&value)
            }
        }
    };
}

impl_concrete!(u8);
impl_concrete!(u16);
impl_concrete!(u32);
impl_concrete!(u64);
impl_concrete!(u128);

impl From<u8> for SymbolicByte {
    fn from(value: u8) -> Self {
        let mut byte = SymbolicByte::default();
        for (i, bit) in symbolize(&[value]).enumerate() {
            byte[i] = bit;
        }

        byte
    }
}

impl From<bool> for SymbolicBit {
    fn from(value: bool) -> Self {
        SymbolicBit::Literal(value)
    }
}

impl TryFrom<&SymbolicByte> for u8 {
    type Error = ConcretizationError;

    fn try_from(value: &SymbolicByte) -> Result<Self, Self::Error> {
        // Eight literal bits always fit
        concretize(value.iter()).map(|value| value as u8)
    }
}

impl TryFrom<SymbolicByte> for u8 {
    type Error = ConcretizationError;

    fn try_from(value: SymbolicByte) -> Result<Self, Self::Error> {
        u8::try_from(&value)
    }
}

impl FromIterator<SymbolicByte> for SymbolicBitVec {
    fn from_iter<T: IntoIterator<Item = SymbolicByte>>(iter: T) -> Self {
        Self {
            bits: iter
                .into_iter()
                .flat_map(<[SymbolicBit; 8]>::from)
                .collect(),
        }
    }
}

impl From<SymbolicBitVec> for Vec<SymbolicByte> {
    /// Split into bytes. A trailing partial byte is zero extended.
    fn from(value: SymbolicBitVec) -> Self {
        value
            .bits
            .chunks(8)
            .map(|chunk| {
                let mut byte = SymbolicByte::default();
                for (i, bit) in chunk.iter().enumerate() {
                    byte[i] = bit.clone();
                }
                byte
            })
            .collect()
    }
}
