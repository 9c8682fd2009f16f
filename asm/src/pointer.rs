use std::collections::HashMap;

use crate::error::{Error, Result};
use arch::word;

/// Handle of a label/pointer in a [`PointerTable`]. Items in the assembly
/// list store handles, never addresses, so the table stays the single place
/// where resolution writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub(crate) u32);

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    size: u16,
    small_hint: bool,
    addr: Option<u16>,
    mark_seq: u32,
}

/// Side table owning every label's name, word size, small-address hint and
/// (after resolution) its address. Re-marking a label is an O(1) bump of its
/// mark sequence; the stale `Mark` item in the list simply stops matching.
#[derive(Debug, Clone, Default)]
pub struct PointerTable {
    entries: Vec<Entry>,
}

impl PointerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, name: String, size: u16, small_hint: bool) -> LabelId {
        let id = LabelId(self.entries.len() as u32);
        self.entries.push(Entry {
            name,
            size,
            small_hint,
            addr: None,
            mark_seq: 0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self, id: LabelId) -> &str {
        &self.entries[id.0 as usize].name
    }

    pub fn size(&self, id: LabelId) -> u16 {
        self.entries[id.0 as usize].size
    }

    pub fn small_hint(&self, id: LabelId) -> bool {
        self.entries[id.0 as usize].small_hint
    }

    pub fn addr(&self, id: LabelId) -> Option<u16> {
        self.entries[id.0 as usize].addr
    }

    pub(crate) fn set_addr(&mut self, id: LabelId, addr: u16) {
        self.entries[id.0 as usize].addr = Some(addr);
    }

    pub(crate) fn seq(&self, id: LabelId) -> u32 {
        self.entries[id.0 as usize].mark_seq
    }

    pub(crate) fn bump_seq(&mut self, id: LabelId) -> u32 {
        let entry = &mut self.entries[id.0 as usize];
        entry.mark_seq += 1;
        entry.mark_seq
    }
}

/// A place in the final image: a fixed cell, an unresolved label, or an
/// offset from either. Pointers are immutable values; `add` builds a new one.
#[derive(Debug, Clone, PartialEq)]
pub enum Pointer {
    Absolute { addr: u16, bank: u8 },
    Label(LabelId),
    Offset { base: Box<Pointer>, offset: i32 },
}

impl From<LabelId> for Pointer {
    fn from(id: LabelId) -> Self {
        Pointer::Label(id)
    }
}

impl Pointer {
    pub fn absolute(addr: u16, bank: u8) -> Pointer {
        Pointer::Absolute { addr, bank }
    }

    pub fn add(self, offset: i32) -> Pointer {
        if offset == 0 {
            self
        } else {
            Pointer::Offset {
                base: Box::new(self),
                offset,
            }
        }
    }

    pub fn bank(&self) -> u8 {
        match self {
            Pointer::Absolute { bank, .. } => *bank,
            Pointer::Label(_) => 0,
            Pointer::Offset { base, .. } => base.bank(),
        }
    }

    pub fn name(&self, table: &PointerTable) -> String {
        match self {
            Pointer::Absolute { addr, .. } => addr.to_string(),
            Pointer::Label(id) => table.name(*id).to_string(),
            Pointer::Offset { base, offset } => format!("{}+{}", base.name(table), offset),
        }
    }

    /// Whether the address fits the 11-bit immediate. For labels this is the
    /// resolved address if known, otherwise the creation-time hint; offsets
    /// delegate to their base.
    pub fn is_small(&self, table: &PointerTable) -> bool {
        match self {
            Pointer::Absolute { addr, .. } => word::is_small(*addr),
            Pointer::Label(id) => match table.addr(*id) {
                Some(addr) => word::is_small(addr),
                None => table.small_hint(*id),
            },
            Pointer::Offset { base, .. } => base.is_small(table),
        }
    }

    /// The resolved address. Labels fail with `UnresolvedAddress` until the
    /// resolver has run.
    pub fn addr(&self, table: &PointerTable) -> Result<u16> {
        match self {
            Pointer::Absolute { addr, .. } => Ok(*addr),
            Pointer::Label(id) => table
                .addr(*id)
                .ok_or_else(|| Error::UnresolvedAddress(table.name(*id).to_string())),
            Pointer::Offset { base, offset } => {
                let base = base.addr(table)?;
                Ok(((base as i32 + offset) & 0xFFFF) as u16)
            }
        }
    }

    /// Address through a resolution lookup, used by the emitters. A label
    /// missing from the lookup was never marked.
    pub(crate) fn get(&self, lookup: &HashMap<LabelId, u16>, table: &PointerTable) -> Result<u16> {
        match self {
            Pointer::Absolute { addr, .. } => Ok(*addr),
            Pointer::Label(id) => lookup
                .get(id)
                .copied()
                .ok_or_else(|| Error::UndefinedLabel(table.name(*id).to_string())),
            Pointer::Offset { base, offset } => {
                let base = base.get(lookup, table)?;
                Ok(((base as i32 + offset) & 0xFFFF) as u16)
            }
        }
    }
}
