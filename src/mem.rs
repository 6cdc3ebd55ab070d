use std::collections::BTreeMap;

use thiserror;

use sym::{ConcretizationError, SymbolicBitVec, SymbolicByte};

/// Upper bound on the number of characters read while searching for a string terminator.
pub const MAX_STRING_LEN: usize = 0x1000;

/// Memory result type
pub type Result<T> = std::result::Result<T, Error>;

/// Possible memory errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// There is no data defined at a particular address
    #[error("no data defined at address {0:#x}")]
    UndefinedData(u64),

    /// The data at this address is symbolic and cannot be used as a concrete value
    #[error("symbolic data at address {address:#x}: {source}")]
    SymbolicData {
        address: u64,
        source: ConcretizationError,
    },

    /// No terminator was found within [MAX_STRING_LEN] characters
    #[error("string at address {0:#x} is not terminated")]
    UnterminatedString(u64),

    /// The string data is not valid in its encoding
    #[error("string at address {0:#x} is not validly encoded")]
    InvalidString(u64),

    /// The arguments provided for a given request are invalid
    #[error("arguments provided are not valid: {0}")]
    InvalidArguments(String),
}

/// Reader for the memory of an emulated process. Only [Self::read_byte] is required, the other
/// readers decode on top of it.
pub trait EmulatedMemory {
    /// Read the [SymbolicByte] stored at the address.
    fn read_byte(&self, address: u64) -> Result<SymbolicByte>;

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<SymbolicByte>> {
        (0..len)
            .map(|i| {
                let offset = u64::try_from(i)
                    .ok()
                    .and_then(|i| address.checked_add(i))
                    .ok_or_else(|| {
                        Error::InvalidArguments(format!(
                            "reading {len} byte(s) overflows address {address:#x}"
                        ))
                    })?;
                self.read_byte(offset)
            })
            .collect()
    }

    /// Read a little-endian value of `len` bytes. The value may be symbolic.
    fn read_value(&self, address: u64, len: usize) -> Result<SymbolicBitVec> {
        Ok(self.read_bytes(address, len)?.into_iter().collect())
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        let value = self.read_value(address, 2)?;
        u16::try_from(&value).map_err(|source| Error::SymbolicData { address, source })
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let value = self.read_value(address, 8)?;
        u64::try_from(&value).map_err(|source| Error::SymbolicData { address, source })
    }

    /// Read a NUL-terminated narrow string. Every byte up to and including the terminator must
    /// be concrete.
    fn read_c_string(&self, address: u64) -> Result<String> {
        let mut bytes = Vec::new();
        for offset in string_offsets(address, 1) {
            let offset = offset?;
            let byte = u8::try_from(self.read_byte(offset)?).map_err(|source| {
                Error::SymbolicData {
                    address: offset,
                    source,
                }
            })?;

            if byte == 0 {
                return String::from_utf8(bytes).map_err(|_| Error::InvalidString(address));
            }

            bytes.push(byte);
        }

        Err(Error::UnterminatedString(address))
    }

    /// Read a NUL-terminated UTF-16LE string.
    fn read_wide_string(&self, address: u64) -> Result<String> {
        let mut units = Vec::new();
        for offset in string_offsets(address, 2) {
            let unit = self.read_u16(offset?)?;
            if unit == 0 {
                return String::from_utf16(&units).map_err(|_| Error::InvalidString(address));
            }

            units.push(unit);
        }

        Err(Error::UnterminatedString(address))
    }
}

/// Addresses of the first [MAX_STRING_LEN] characters of `char_size` bytes starting at `address`.
fn string_offsets(address: u64, char_size: u64) -> impl Iterator<Item = Result<u64>> {
    (0..MAX_STRING_LEN as u64).map(move |i| {
        address
            .checked_add(i * char_size)
            .ok_or_else(|| {
                Error::InvalidArguments(format!("string at {address:#x} overflows address space"))
            })
    })
}

/// A memory model that stores [SymbolicByte] values keyed on address.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    data: BTreeMap<u64, SymbolicByte>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the given bytes starting at the address.
    pub fn write(
        &mut self,
        address: u64,
        data: impl IntoIterator<IntoIter = impl ExactSizeIterator<Item = impl Into<SymbolicByte>>>,
    ) -> Result<()> {
        let data = data.into_iter();

        // Make sure the write does not overflow the address
        let overflows = u64::try_from(data.len())
            .ok()
            .and_then(|size| address.checked_add(size))
            .is_none();

        if overflows {
            return Err(Error::InvalidArguments(format!(
                "writing {size} byte(s) overflows address {address:#x}",
                size = data.len()
            )));
        }

        let mut offset = address;
        for byte in data {
            self.data.insert(offset, byte.into());
            offset += 1;
        }

        Ok(())
    }

    /// Writes a NUL-terminated narrow string.
    pub fn write_c_string(&mut self, address: u64, value: &str) -> Result<()> {
        self.write(address, value.bytes().chain(std::iter::once(0)).collect::<Vec<_>>())
    }

    /// Writes a NUL-terminated UTF-16LE string.
    pub fn write_wide_string(&mut self, address: u64, value: &str) -> Result<()> {
        let bytes = value
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect::<Vec<_>>();
        self.write(address, bytes)
    }

    /// Writes a value that may be symbolic. Partial trailing bytes are zero extended.
    pub fn write_value(&mut self, address: u64, value: SymbolicBitVec) -> Result<()> {
        self.write(address, Vec::<SymbolicByte>::from(value))
    }
}

impl EmulatedMemory for Memory {
    fn read_byte(&self, address: u64) -> Result<SymbolicByte> {
        self.data
            .get(&address)
            .cloned()
            .ok_or(Error::UndefinedData(address))
    }
}
