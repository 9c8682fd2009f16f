use arch::isa::InstSet;
use arch::word::Word;

use crate::error::{Error, Result};
use crate::pointer::{LabelId, Pointer, PointerTable};

/// Either an inline value or a pointer whose resolved address becomes the
/// value. Mnemonic helpers accept `impl Into<Operand>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Data(u16),
    Ptr(Pointer),
}

impl From<u16> for Operand {
    fn from(v: u16) -> Self {
        Operand::Data(v)
    }
}

impl From<Pointer> for Operand {
    fn from(p: Pointer) -> Self {
        Operand::Ptr(p)
    }
}

impl From<&Pointer> for Operand {
    fn from(p: &Pointer) -> Self {
        Operand::Ptr(p.clone())
    }
}

impl From<LabelId> for Operand {
    fn from(id: LabelId) -> Self {
        Operand::Ptr(Pointer::Label(id))
    }
}

/// One entry of the assembly list.
///
/// A `Mark` binds a label to the current write position and occupies no image
/// space; it is live only while its sequence matches the label's current mark
/// sequence in the table. An `Inst` emits exactly one machine word: a packed
/// instruction, a raw literal (`raw`), or - when `word` is `None` - the bare
/// resolved address of `ptr`.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyItem {
    Mark {
        label: LabelId,
        seq: u32,
    },
    Inst {
        word: Option<Word>,
        ptr: Option<Pointer>,
        raw: bool,
        comment: Option<String>,
    },
}

/// Insertion-ordered sequence of emitted items plus the pointer side table.
/// Supports mid-list insertion for the reserve-then-fill pattern used by
/// forward address tables.
#[derive(Debug, Clone)]
pub struct AssemblyList {
    items: Vec<AssemblyItem>,
    table: PointerTable,
    set: InstSet,
    label_count: u32,
    pointer_count: u32,
}

impl AssemblyList {
    pub fn new(set: InstSet) -> Self {
        Self {
            items: Vec::new(),
            table: PointerTable::new(),
            set,
            label_count: 0,
            pointer_count: 0,
        }
    }

    /// An empty list sharing this list's table and instruction set, so items
    /// of either list refer to the same label handles. Used when assembling
    /// the final image around an already-emitted body.
    pub fn fork(&self) -> Self {
        Self {
            items: Vec::new(),
            table: self.table.clone(),
            set: self.set.clone(),
            label_count: self.label_count,
            pointer_count: self.pointer_count,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[AssemblyItem] {
        &self.items
    }

    pub fn table(&self) -> &PointerTable {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut PointerTable {
        &mut self.table
    }

    pub fn set(&self) -> &InstSet {
        &self.set
    }

    /// Allocate an unresolved label; nothing is inserted into the list until
    /// it is marked.
    pub fn create_label(&mut self, name: Option<&str>) -> LabelId {
        let name = match name {
            Some(n) => n.to_string(),
            None => {
                let n = format!("L{}", self.label_count);
                self.label_count += 1;
                n
            }
        };
        self.table.alloc(name, 1, false)
    }

    /// Allocate a pointer without touching the item list. Used for storage
    /// cells whose mark is emitted later (pools, stack slots).
    pub fn alloc_pointer(&mut self, name: Option<&str>, size: u16, small_hint: bool) -> LabelId {
        let name = match name {
            Some(n) => n.to_string(),
            None => {
                let n = format!("P{}", self.pointer_count);
                self.pointer_count += 1;
                n
            }
        };
        self.table.alloc(name, size, small_hint)
    }

    /// Allocate a data-slot pointer and bind it into the list. With `at`
    /// given the mark is inserted mid-list (shifting later items); otherwise
    /// it binds just before the last emitted item, i.e. to that item's word.
    pub fn create_pointer(&mut self, name: Option<&str>, at: Option<usize>) -> LabelId {
        let id = self.alloc_pointer(name, 1, false);
        if self.items.is_empty() {
            return id;
        }
        let at = at.unwrap_or(self.items.len() - 1);
        let seq = self.table.bump_seq(id);
        self.items.insert(at, AssemblyItem::Mark { label: id, seq });
        id
    }

    /// Bind a label to the current write position. Re-marking moves the
    /// binding: the previous `Mark` item goes stale and is skipped by the
    /// resolver.
    pub fn mark(&mut self, label: LabelId) {
        let seq = self.table.bump_seq(label);
        self.items.push(AssemblyItem::Mark { label, seq });
    }

    /// Emit one instruction word, by mnemonic. Inline data is range-checked
    /// here, never deferred.
    pub fn emit(&mut self, name: &str, operand: Operand, at: Option<usize>) -> Result<()> {
        let (id, _) = self
            .set
            .get(name)
            .ok_or_else(|| Error::UnknownInstruction(name.to_string()))?;
        let item = match operand {
            Operand::Data(data) => AssemblyItem::Inst {
                word: Some(Word::pack(id, data)?),
                ptr: None,
                raw: false,
                comment: None,
            },
            Operand::Ptr(ptr) => AssemblyItem::Inst {
                word: Some(Word::pack(id, 0)?),
                ptr: Some(ptr),
                raw: false,
                comment: None,
            },
        };
        self.push(item, at);
        Ok(())
    }

    /// Emit one raw word: a 16-bit literal, or a pointer whose resolved
    /// address becomes the word. Used for the second word of the two-word
    /// large-address forms and for data tables.
    pub fn emit_raw(&mut self, value: Operand) {
        let item = match value {
            Operand::Data(v) => AssemblyItem::Inst {
                word: Some(Word::from_raw(v)),
                ptr: None,
                raw: true,
                comment: None,
            },
            Operand::Ptr(ptr) => AssemblyItem::Inst {
                word: None,
                ptr: Some(ptr),
                raw: true,
                comment: None,
            },
        };
        self.push(item, None);
    }

    /// Insert a raw literal mid-list and return a pointer bound to it.
    pub fn emit_raw_at(&mut self, at: usize, value: u16) -> LabelId {
        self.push(
            AssemblyItem::Inst {
                word: Some(Word::from_raw(value)),
                ptr: None,
                raw: true,
                comment: None,
            },
            Some(at),
        );
        self.create_pointer(None, Some(at))
    }

    /// Attach a comment to the most recently emitted instruction.
    pub fn set_comment(&mut self, text: &str) {
        if let Some(AssemblyItem::Inst { comment, .. }) = self.items.last_mut() {
            *comment = Some(text.to_string());
        }
    }

    /// Append clones of another list's items. Both lists must share the same
    /// table lineage (see [`AssemblyList::fork`]).
    pub fn extend(&mut self, other: &AssemblyList) {
        self.items.extend(other.items.iter().cloned());
    }

    fn push(&mut self, item: AssemblyItem, at: Option<usize>) {
        match at {
            Some(at) => self.items.insert(at, item),
            None => self.items.push(item),
        }
    }
}

impl Default for AssemblyList {
    fn default() -> Self {
        Self::new(arch::isa::default_set().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::word::WordError;

    #[test]
    fn unknown_instruction() {
        let mut list = AssemblyList::default();
        assert_eq!(
            list.emit("XYZ", Operand::Data(0), None),
            Err(Error::UnknownInstruction("XYZ".into()))
        );
    }

    #[test]
    fn inline_data_checked_eagerly() {
        let mut list = AssemblyList::default();
        assert_eq!(
            list.emit("LDIA", Operand::Data(0x800), None),
            Err(Error::Word(WordError::DataOutOfRange(0x800)))
        );
        assert!(list.is_empty());
    }

    #[test]
    fn mnemonic_case_insensitive() {
        let mut list = AssemblyList::default();
        list.emit("ldia", Operand::Data(5), None).unwrap();
        list.emit("Add", Operand::Data(0), None).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remark_goes_stale() {
        let mut list = AssemblyList::default();
        let label = list.create_label(Some("loop"));
        list.mark(label);
        list.emit("ADD", Operand::Data(0), None).unwrap();
        list.mark(label);
        let live: Vec<u32> = list
            .items()
            .iter()
            .filter_map(|item| match item {
                AssemblyItem::Mark { label: l, seq } if *l == label => Some(*seq),
                _ => None,
            })
            .collect();
        assert_eq!(live, vec![1, 2]);
        assert_eq!(list.table().seq(label), 2);
    }

    #[test]
    fn create_pointer_binds_last_item() {
        let mut list = AssemblyList::default();
        list.emit_raw(Operand::Data(0xBEEF));
        let id = list.create_pointer(Some("slot"), None);
        // Mark sits right before the raw word.
        assert!(matches!(list.items()[0], AssemblyItem::Mark { label, .. } if label == id));
    }

    #[test]
    fn raw_insert_mid_list() {
        let mut list = AssemblyList::default();
        list.emit("ADD", Operand::Data(0), None).unwrap();
        list.emit("SUB", Operand::Data(0), None).unwrap();
        let id = list.emit_raw_at(1, 0x1234);
        // mark + raw inserted between the two instructions
        assert_eq!(list.len(), 4);
        assert!(matches!(list.items()[1], AssemblyItem::Mark { label, .. } if label == id));
        assert!(
            matches!(list.items()[2], AssemblyItem::Inst { word: Some(w), raw: true, .. } if w.raw() == 0x1234)
        );
    }
}
