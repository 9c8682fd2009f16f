use thiserror::Error;

/// Highest value of the 5-bit opcode field.
pub const MAX_OPCODE: u16 = 0b11111;
/// Highest value of the 11-bit immediate field.
pub const MAX_DATA: u16 = 0x7FF;
/// Bit width of the immediate field.
pub const DATA_BITS: u32 = 11;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WordError {
    #[error("Opcode {0} exceeds the 5-bit field (max {MAX_OPCODE})")]
    OpcodeOutOfRange(u16),
    #[error("Immediate 0x{0:04X} exceeds the 11-bit field (max 0x{MAX_DATA:03X})")]
    DataOutOfRange(u16),
}

/// Whether an address fits the 11-bit immediate field. This is the single
/// small-vs-large decision point for the whole toolchain.
pub fn is_small(addr: u16) -> bool {
    addr <= MAX_DATA
}

/// One machine word: `(opcode << 11) | (imm & 0x7FF)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Word(u16);

impl Word {
    pub fn pack(opcode: u8, data: u16) -> Result<Word, WordError> {
        if u16::from(opcode) > MAX_OPCODE {
            return Err(WordError::OpcodeOutOfRange(opcode.into()));
        }
        if data > MAX_DATA {
            return Err(WordError::DataOutOfRange(data));
        }
        Ok(Word((u16::from(opcode) << DATA_BITS) | data))
    }

    pub fn from_raw(raw: u16) -> Word {
        Word(raw)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn opcode(self) -> u8 {
        (self.0 >> DATA_BITS) as u8
    }

    pub fn data(self) -> u16 {
        self.0 & MAX_DATA
    }

    pub fn unpack(self) -> (u8, u16) {
        (self.opcode(), self.data())
    }

    /// Replace the immediate field, keeping the opcode.
    pub fn with_data(self, data: u16) -> Word {
        Word((self.0 & !MAX_DATA) | (data & MAX_DATA))
    }
}
