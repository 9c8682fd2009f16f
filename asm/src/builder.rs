use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;

use arch::isa::{InstSet, OpKind};
use arch::word;

use crate::address::{Address, FileKind};
use crate::error::Result;
use crate::list::{AssemblyList, Operand};
use crate::pointer::{LabelId, Pointer};
use crate::resolve::Program;

/// Zero-initialised storage cells emitted in the image header.
#[derive(Debug, Default)]
struct Pool {
    cells: Vec<LabelId>,
    free: Vec<LabelId>,
}

/// Code-generation facade over an [`AssemblyList`]: mnemonic helpers, the
/// interned string pool, the file registry, global and temporary cell pools,
/// and final image assembly.
///
/// `build` lays out the image as header (a jump over the zeroed cells), then
/// the emitted body, then the data section (strings and file contents behind
/// a jump), and runs one resolution pass over the whole thing.
pub struct Builder {
    list: AssemblyList,
    strings: IndexMap<String, Rc<Address>>,
    files: IndexMap<(String, FileKind), Rc<Address>>,
    globals: Pool,
    temps: Pool,
}

impl Builder {
    pub fn new() -> Self {
        Self::with_set(arch::isa::default_set().clone())
    }

    pub fn with_set(set: InstSet) -> Self {
        Self {
            list: AssemblyList::new(set),
            strings: IndexMap::new(),
            files: IndexMap::new(),
            globals: Pool::default(),
            temps: Pool::default(),
        }
    }

    pub fn list(&self) -> &AssemblyList {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn create_label(&mut self, name: Option<&str>) -> LabelId {
        self.list.create_label(name)
    }

    pub fn create_pointer(&mut self, name: Option<&str>, at: Option<usize>) -> LabelId {
        self.list.create_pointer(name, at)
    }

    pub fn mark(&mut self, label: LabelId) {
        self.list.mark(label);
    }

    pub fn set_comment(&mut self, text: &str) {
        self.list.set_comment(text);
    }

    pub fn emit(&mut self, name: &str, operand: impl Into<Operand>) -> Result<()> {
        self.list.emit(name, operand.into(), None)
    }

    pub fn emit_raw(&mut self, value: impl Into<Operand>) {
        self.list.emit_raw(value.into());
    }

    pub fn emit_raw_at(&mut self, at: usize, value: u16) -> LabelId {
        self.list.emit_raw_at(at, value)
    }

    /// Resolved address of a pointer, available after [`Builder::build`].
    pub fn address_of(&self, ptr: &Pointer) -> Result<u16> {
        ptr.addr(self.list.table())
    }

    fn op(&mut self, kind: OpKind, operand: Operand) -> Result<()> {
        self.list.emit(&kind.to_string(), operand, None)
    }

    // -- register / ALU helpers ----------------------------------------

    pub fn nop(&mut self) {
        self.list.emit_raw(Operand::Data(0));
    }

    pub fn load_a(&mut self, addr: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::AIN, addr.into())
    }

    pub fn load_b(&mut self, addr: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::BIN, addr.into())
    }

    pub fn load_c(&mut self, addr: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::CIN, addr.into())
    }

    /// Load a value into A, choosing the one-word immediate form when it
    /// fits and the two-word form otherwise.
    pub fn set_a(&mut self, value: impl Into<Operand>) -> Result<()> {
        match value.into() {
            Operand::Data(v) if word::is_small(v) => self.op(OpKind::LDIA, Operand::Data(v)),
            Operand::Data(v) => self.set_a_large(Operand::Data(v)),
            Operand::Ptr(p) if p.is_small(self.list.table()) => {
                self.op(OpKind::LDIA, Operand::Ptr(p))
            }
            Operand::Ptr(p) => self.set_a_large(Operand::Ptr(p)),
        }
    }

    pub fn set_b(&mut self, value: impl Into<Operand>) -> Result<()> {
        match value.into() {
            Operand::Data(v) if word::is_small(v) => self.op(OpKind::LDIB, Operand::Data(v)),
            Operand::Data(v) => self.set_b_large(Operand::Data(v)),
            Operand::Ptr(p) if p.is_small(self.list.table()) => {
                self.op(OpKind::LDIB, Operand::Ptr(p))
            }
            Operand::Ptr(p) => self.set_b_large(Operand::Ptr(p)),
        }
    }

    pub fn set_a_large(&mut self, value: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::LDW, Operand::Data(0))?;
        self.list.emit_raw(value.into());
        Ok(())
    }

    pub fn set_b_large(&mut self, value: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::LDWB, Operand::Data(0))?;
        self.list.emit_raw(value.into());
        Ok(())
    }

    pub fn store_a(&mut self, addr: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::STA, addr.into())
    }

    pub fn load_a_large(&mut self, addr: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::LDLGE, Operand::Data(0))?;
        self.list.emit_raw(addr.into());
        Ok(())
    }

    pub fn store_a_large(&mut self, addr: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::STLGE, Operand::Data(0))?;
        self.list.emit_raw(addr.into());
        Ok(())
    }

    pub fn add(&mut self) -> Result<()> {
        self.op(OpKind::ADD, Operand::Data(0))
    }

    pub fn sub(&mut self) -> Result<()> {
        self.op(OpKind::SUB, Operand::Data(0))
    }

    pub fn mult(&mut self) -> Result<()> {
        self.op(OpKind::MULT, Operand::Data(0))
    }

    pub fn div(&mut self) -> Result<()> {
        self.op(OpKind::DIV, Operand::Data(0))
    }

    pub fn and(&mut self) -> Result<()> {
        self.op(OpKind::AND, Operand::Data(0))
    }

    pub fn or(&mut self) -> Result<()> {
        self.op(OpKind::OR, Operand::Data(0))
    }

    pub fn not(&mut self) -> Result<()> {
        self.op(OpKind::NOT, Operand::Data(0))
    }

    pub fn bit_shift_left(&mut self) -> Result<()> {
        self.op(OpKind::BSL, Operand::Data(0))
    }

    pub fn bit_shift_right(&mut self) -> Result<()> {
        self.op(OpKind::BSR, Operand::Data(0))
    }

    pub fn swap_a_b(&mut self) -> Result<()> {
        self.op(OpKind::SWP, Operand::Data(0))
    }

    pub fn swap_a_c(&mut self) -> Result<()> {
        self.op(OpKind::SWPC, Operand::Data(0))
    }

    pub fn pc_to_a(&mut self) -> Result<()> {
        self.op(OpKind::PCR, Operand::Data(0))
    }

    /// Load the word addressed by A into A.
    pub fn load_a_in_a(&mut self) -> Result<()> {
        self.op(OpKind::LDAIN, Operand::Data(0))
    }

    /// Store B at the address in A.
    pub fn store_b_at_a(&mut self) -> Result<()> {
        self.op(OpKind::STAOUT, Operand::Data(0))
    }

    pub fn set_bank(&mut self, bank: u8) -> Result<()> {
        self.op(OpKind::BNK, Operand::Data(bank.into()))
    }

    pub fn set_bank_c(&mut self) -> Result<()> {
        self.op(OpKind::BNKC, Operand::Data(0))
    }

    pub fn halt(&mut self) -> Result<()> {
        self.op(OpKind::HLT, Operand::Data(0))
    }

    // -- control flow --------------------------------------------------

    /// Two-word unconditional jump; the target is a full 16-bit word.
    pub fn jump(&mut self, target: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::JMP, Operand::Data(0))?;
        self.list.emit_raw(target.into());
        Ok(())
    }

    pub fn jump_if_zero(&mut self, target: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::JMPZ, Operand::Data(0))?;
        self.list.emit_raw(target.into());
        Ok(())
    }

    pub fn jump_if_carry(&mut self, target: impl Into<Operand>) -> Result<()> {
        self.op(OpKind::JMPC, Operand::Data(0))?;
        self.list.emit_raw(target.into());
        Ok(())
    }

    pub fn jump_to_a(&mut self) -> Result<()> {
        self.op(OpKind::JREG, Operand::Data(0))
    }

    // -- pointer access ------------------------------------------------

    /// Load the word behind `ptr` into A. Picks the small, large or banked
    /// sequence from the pointer itself; banked access is bracketed by
    /// `BNK bank` / `BNK 0`.
    pub fn load_ptr(&mut self, ptr: &Pointer) -> Result<()> {
        if ptr.bank() == 0 {
            if ptr.is_small(self.list.table()) {
                self.load_a(ptr)
            } else {
                self.load_a_large(ptr)
            }
        } else {
            self.set_a(ptr)?;
            self.set_bank(ptr.bank())?;
            self.load_a_in_a()?;
            self.set_bank(0)
        }
    }

    /// Store A at `ptr`, with the same form selection as [`Builder::load_ptr`].
    /// The banked sequence routes the value through B and restores it.
    pub fn store_ptr(&mut self, ptr: &Pointer) -> Result<()> {
        if ptr.bank() == 0 {
            if ptr.is_small(self.list.table()) {
                self.store_a(ptr)
            } else {
                self.store_a_large(ptr)
            }
        } else {
            self.swap_a_b()?;
            self.set_a(ptr)?;
            self.set_bank(ptr.bank())?;
            self.store_b_at_a()?;
            self.set_bank(0)?;
            self.swap_a_b()
        }
    }

    /// Copy one word from `from` to `to` through A.
    pub fn copy_ptr(&mut self, from: &Pointer, to: &Pointer) -> Result<()> {
        self.load_ptr(from)?;
        self.store_ptr(to)
    }

    // -- pools ---------------------------------------------------------

    /// A named zero-initialised cell (or block of `size` cells) in the image
    /// header.
    pub fn global(&mut self, name: &str, size: u16) -> Pointer {
        let id = self.list.alloc_pointer(Some(name), size, true);
        self.globals.cells.push(id);
        Pointer::Label(id)
    }

    /// A reusable scratch cell. Released temporaries are handed out again.
    pub fn temp(&mut self) -> Pointer {
        let id = match self.temps.free.pop() {
            Some(id) => id,
            None => {
                let id = self.list.alloc_pointer(None, 1, true);
                self.temps.cells.push(id);
                id
            }
        };
        Pointer::Label(id)
    }

    pub fn release_temp(&mut self, ptr: Pointer) {
        if let Pointer::Label(id) = ptr {
            self.temps.free.push(id);
        }
    }

    // -- data ----------------------------------------------------------

    /// Intern a string literal. Equal literals share one address; the data
    /// is emitted once in the data section.
    pub fn get_string(&mut self, value: &str) -> Rc<Address> {
        if let Some(addr) = self.strings.get(value) {
            return addr.clone();
        }
        let name = format!("str{}", self.strings.len());
        let size = value.chars().count() as u16 + 1;
        let id = self.list.alloc_pointer(Some(&name), size, false);
        let addr = Rc::new(Address::Str {
            pointer: Pointer::Label(id),
            value: value.to_string(),
        });
        self.strings.insert(value.to_string(), addr.clone());
        addr
    }

    /// Register a file's contents, keyed by path and kind. The returned
    /// address stays length-less until a loader injects its words via
    /// [`Address::set_content`]; unloaded files are left out of the image.
    pub fn get_file(&mut self, path: &str, kind: FileKind) -> Rc<Address> {
        let key = (path.to_string(), kind);
        if let Some(addr) = self.files.get(&key) {
            return addr.clone();
        }
        let name = format!("file{}", self.files.len());
        let id = self.list.alloc_pointer(Some(&name), 1, false);
        let addr = Rc::new(Address::File {
            pointer: Pointer::Label(id),
            kind,
            path: path.to_string(),
            content: OnceCell::new(),
        });
        self.files.insert(key, addr.clone());
        addr
    }

    // -- image assembly ------------------------------------------------

    fn emit_header(&self, out: &mut AssemblyList) -> Result<()> {
        if self.globals.cells.is_empty() && self.temps.cells.is_empty() {
            return Ok(());
        }
        let program = out.create_label(Some("Program"));
        emit_jump(out, program)?;
        out.set_comment("jump over storage cells");
        for &id in self.globals.cells.iter().chain(&self.temps.cells) {
            out.mark(id);
            for _ in 0..out.table().size(id) {
                out.emit_raw(Operand::Data(0));
            }
        }
        out.mark(program);
        Ok(())
    }

    fn emit_data(&self, out: &mut AssemblyList) -> Result<()> {
        if self.strings.is_empty() && self.files.is_empty() {
            return Ok(());
        }
        let end = out.create_label(Some("End"));
        emit_jump(out, end)?;
        out.set_comment("jump over data section");
        for addr in self.strings.values() {
            let Address::Str { pointer, value } = addr.as_ref() else {
                continue;
            };
            if let Pointer::Label(id) = pointer {
                out.mark(*id);
            }
            for c in value.chars() {
                out.emit_raw(Operand::Data(arch::charset::char_to_code(c).unwrap_or(0)));
            }
            out.emit_raw(Operand::Data(0xFFFF));
        }
        for addr in self.files.values() {
            let Address::File {
                pointer, content, ..
            } = addr.as_ref()
            else {
                continue;
            };
            let Some(content) = content.get() else {
                continue;
            };
            for (i, word) in content.words.iter().enumerate() {
                if i == content.offset {
                    if let Pointer::Label(id) = pointer {
                        out.mark(*id);
                    }
                }
                out.emit_raw(Operand::Data(*word));
            }
        }
        out.mark(end);
        Ok(())
    }

    /// Assemble and resolve the final image based at `offset`. Resolved
    /// addresses are written back, so pointers handed out by this builder
    /// answer [`Builder::address_of`] afterwards.
    pub fn build(&mut self, offset: u16) -> Result<Program> {
        let mut out = self.list.fork();
        self.emit_header(&mut out)?;
        out.extend(&self.list);
        self.emit_data(&mut out)?;
        let prog = out.build(offset);

        let resolved: Vec<(LabelId, u16)> =
            prog.lookup().iter().map(|(id, addr)| (*id, *addr)).collect();
        for (id, addr) in resolved {
            if (id.0 as usize) < self.list.table().len() {
                self.list.table_mut().set_addr(id, addr);
            }
        }
        Ok(prog)
    }
}

impl Pointer {
    /// Load the word at `self + offset` into A through the builder's form
    /// selection, so callers never pick between the small and large
    /// encodings themselves.
    pub fn load_to(&self, builder: &mut Builder, offset: i32) -> Result<()> {
        builder.load_ptr(&self.clone().add(offset))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn emit_jump(list: &mut AssemblyList, target: LabelId) -> Result<()> {
    list.emit("JMP", Operand::Data(0), None)?;
    list.emit_raw(Operand::Ptr(Pointer::Label(target)));
    Ok(())
}
