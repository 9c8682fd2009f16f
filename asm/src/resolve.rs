use std::collections::HashMap;

use arch::isa::InstSet;

use crate::list::{AssemblyItem, AssemblyList};
use crate::pointer::{LabelId, PointerTable};

/// A resolved snapshot of an assembly list: every live mark assigned its
/// final address, plus the emitted word count. All emitters are pure
/// functions of this, so every produced artifact is mutually consistent.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) items: Vec<AssemblyItem>,
    pub(crate) table: PointerTable,
    pub(crate) lookup: HashMap<LabelId, u16>,
    pub(crate) set: InstSet,
    length: u16,
    offset: u16,
}

impl Program {
    /// Number of machine words in the image.
    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn lookup(&self) -> &HashMap<LabelId, u16> {
        &self.lookup
    }
}

impl AssemblyList {
    /// Resolve the list into a [`Program`], with the image based at
    /// `offset`. One linear pass: each live mark records the running cursor,
    /// each instruction item advances it by exactly one word. Stacked marks
    /// at the same cursor all receive that address. Resolution never fails;
    /// an unmarked pointer only surfaces when an emitter dereferences it.
    ///
    /// Addresses are also written into the pointer table, so callers can
    /// query cell addresses after building.
    pub fn build(&mut self, offset: u16) -> Program {
        let mut lookup = HashMap::new();
        let mut cursor = offset;
        let mut length = 0u16;

        for item in self.items() {
            match item {
                AssemblyItem::Mark { label, seq } => {
                    if *seq == self.table().seq(*label) {
                        lookup.insert(*label, cursor);
                    }
                }
                AssemblyItem::Inst { .. } => {
                    cursor += 1;
                    length += 1;
                }
            }
        }

        for (label, addr) in &lookup {
            self.table_mut().set_addr(*label, *addr);
        }

        Program {
            items: self.items().to_vec(),
            table: self.table().clone(),
            lookup,
            set: self.set().clone(),
            length,
            offset,
        }
    }
}
