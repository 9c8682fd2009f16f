use bimap::BiMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::word::{WordError, MAX_OPCODE};

/// The default instruction ROM, in opcode order (ids 0..=31).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    EnumIter,
    Display,
)]
#[repr(u8)]
pub enum OpKind {
    FETCH,
    AIN,
    BIN,
    CIN,
    LDIA,
    LDIB,
    STA,
    ADD,
    SUB,
    MULT,
    DIV,
    JMP,
    JMPZ,
    JMPC,
    JREG,
    LDAIN,
    STAOUT,
    LDLGE,
    STLGE,
    LDW,
    SWP,
    SWPC,
    PCR,
    BSL,
    BSR,
    AND,
    OR,
    NOT,
    BNK,
    BNKC,
    LDWB,
    HLT,
}

impl OpKind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_uppercase().parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Undefined Op: {s}")),
        }
    }

    pub fn id(self) -> u8 {
        self.into()
    }

    /// Whether the instruction reads its 11-bit immediate field.
    pub fn imm_required(self) -> bool {
        use OpKind::*;
        matches!(
            self,
            AIN | BIN | CIN | LDIA | LDIB | STA | LDLGE | STLGE | LDW | BNK | LDWB
        )
    }
}

/// Case-insensitive opcode table: name -> (id, imm required). Builders take
/// one of these at construction so the emission engine never hardcodes the
/// instruction set.
#[derive(Debug, Clone, Default)]
pub struct InstSet {
    names: BiMap<String, u8>,
    imm: HashSet<u8>,
}

impl InstSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, id: u8, imm_required: bool) -> Result<(), WordError> {
        if u16::from(id) > MAX_OPCODE {
            return Err(WordError::OpcodeOutOfRange(id.into()));
        }
        self.names.insert(name.to_uppercase(), id);
        if imm_required {
            self.imm.insert(id);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<(u8, bool)> {
        let id = *self.names.get_by_left(&name.to_uppercase())?;
        Some((id, self.imm.contains(&id)))
    }

    pub fn name_of(&self, id: u8) -> Option<&str> {
        self.names.get_by_right(&id).map(String::as_str)
    }

    pub fn imm_required(&self, id: u8) -> bool {
        self.imm.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

static DEFAULT_SET: Lazy<InstSet> = Lazy::new(|| {
    let mut set = InstSet::new();
    for kind in OpKind::iter() {
        set.add(&kind.to_string(), kind.id(), kind.imm_required())
            .unwrap();
    }
    set
});

pub fn default_set() -> &'static InstSet {
    &DEFAULT_SET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(OpKind::parse("ldia"), Ok(OpKind::LDIA));
        assert_eq!(OpKind::parse("Hlt"), Ok(OpKind::HLT));
        assert!(OpKind::parse("hoge").is_err());
    }

    #[test]
    fn ids_are_rom_order() {
        assert_eq!(OpKind::FETCH.id(), 0);
        assert_eq!(OpKind::JMP.id(), 11);
        assert_eq!(OpKind::BNK.id(), 28);
        assert_eq!(OpKind::HLT.id(), 31);
    }

    #[test]
    fn default_set_lookup() {
        let set = default_set();
        assert_eq!(set.len(), 32);
        assert_eq!(set.get("sta"), Some((6, true)));
        assert_eq!(set.get("ADD"), Some((7, false)));
        assert_eq!(set.get("nope"), None);
        assert_eq!(set.name_of(11), Some("JMP"));
    }

    #[test]
    fn custom_set_rejects_wide_id() {
        let mut set = InstSet::new();
        assert!(set.add("X", 31, false).is_ok());
        assert_eq!(set.add("Y", 32, false), Err(WordError::OpcodeOutOfRange(32)));
    }
}
