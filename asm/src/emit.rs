use std::fmt::Write as _;

use color_print::cformat;

use arch::isa::InstSet;
use arch::word::Word;

use crate::error::{Error, Result};
use crate::list::AssemblyItem;
use crate::resolve::Program;

pub const ROM_HEADER: &str = "v3.0 hex words addressed";
pub const HEX_HEADER: &str = "ASTRO-8 AEXE Executable file";
const ROM_WORDS_PER_LINE: usize = 8;

/// Logisim-style memory ROM image: addressed lines of 8 hex words,
/// zero-padded up to `min_size` words.
pub fn rom_hex(words: &[u16], min_size: usize) -> String {
    let mut words = words.to_vec();
    if words.len() < min_size {
        words.resize(min_size, 0);
    }
    let mut out = String::new();
    out.push_str(ROM_HEADER);
    out.push('\n');
    for (i, chunk) in words.chunks(ROM_WORDS_PER_LINE).enumerate() {
        let _ = write!(out, "{:03x}:", i * ROM_WORDS_PER_LINE);
        for word in chunk {
            let _ = write!(out, " {word:04x}");
        }
        out.push('\n');
    }
    out
}

/// Flat executable image: header line, then one hex word per line.
pub fn flat_hex(words: &[u16]) -> String {
    let mut out = String::new();
    out.push_str(HEX_HEADER);
    out.push('\n');
    for word in words {
        let _ = write!(out, "{word:04x}");
        out.push('\n');
    }
    out
}

/// Decode an image back into mnemonics through the reverse opcode map.
/// Words whose opcode has no name in `set` render as `HERE` literals.
pub fn disassemble(words: &[u16], set: &InstSet) -> String {
    let mut out = String::new();
    for (addr, &raw) in words.iter().enumerate() {
        let word = Word::from_raw(raw);
        let _ = write!(out, "{addr:04x}: ");
        match set.name_of(word.opcode()) {
            Some(name) => {
                out.push_str(name);
                if word.data() != 0 || set.imm_required(word.opcode()) {
                    let _ = write!(out, " {}", word.data());
                }
            }
            None => {
                let _ = write!(out, "HERE {raw}");
            }
        }
        out.push('\n');
    }
    out
}

impl Program {
    fn word_of(&self, item: &AssemblyItem) -> Result<Option<u16>> {
        match item {
            AssemblyItem::Mark { .. } => Ok(None),
            AssemblyItem::Inst { word, ptr, .. } => {
                let value = match (word, ptr) {
                    (Some(w), None) => w.raw(),
                    (Some(w), Some(p)) => w.with_data(p.get(&self.lookup, &self.table)?).raw(),
                    (None, Some(p)) => p.get(&self.lookup, &self.table)?,
                    (None, None) => return Err(Error::InvalidInstruction),
                };
                Ok(Some(value))
            }
        }
    }

    /// The raw machine image, one `u16` per emitted word. Fails on any
    /// pointer whose label was never marked; no word is ever silently zero.
    pub fn to_words(&self) -> Result<Vec<u16>> {
        let mut words = Vec::with_capacity(self.len());
        for item in &self.items {
            if let Some(word) = self.word_of(item)? {
                words.push(word);
            }
        }
        Ok(words)
    }

    /// Write the image into `buf`, starting at the program's base offset.
    /// The buffer must hold `offset + len` words.
    pub fn copy_to(&self, buf: &mut [u16]) -> Result<()> {
        let need = self.offset() as usize + self.len();
        if buf.len() < need {
            return Err(Error::ImageOverflow {
                need,
                have: buf.len(),
            });
        }
        let mut cursor = self.offset() as usize;
        for item in &self.items {
            if let Some(word) = self.word_of(item)? {
                buf[cursor] = word;
                cursor += 1;
            }
        }
        Ok(())
    }

    /// ROM image of the resolved program; see [`rom_hex`].
    pub fn to_rom_hex(&self, min_size: usize) -> Result<String> {
        Ok(rom_hex(&self.to_words()?, min_size))
    }

    /// Flat executable image of the resolved program; see [`flat_hex`].
    pub fn to_hex(&self) -> Result<String> {
        Ok(flat_hex(&self.to_words()?))
    }

    fn assembly_lines(&self, comments: bool) -> Result<Vec<Line>> {
        let mut lines = Vec::new();
        for item in &self.items {
            match item {
                AssemblyItem::Mark { label, seq } => {
                    if *seq == self.table.seq(*label) {
                        lines.push(Line::Mark(self.table.name(*label).to_string()));
                    }
                }
                AssemblyItem::Inst {
                    word,
                    ptr,
                    raw,
                    comment,
                } => {
                    let ptr_name = ptr.as_ref().map(|p| p.name(&self.table));
                    let comment = if comments { comment.clone() } else { None };
                    if *raw || word.is_none() {
                        let value = self
                            .word_of(item)?
                            .ok_or(Error::InvalidInstruction)?;
                        lines.push(Line::Raw {
                            value,
                            ptr: ptr_name,
                            comment,
                        });
                    } else {
                        let word = word.ok_or(Error::InvalidInstruction)?;
                        let name = self
                            .set
                            .name_of(word.opcode())
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("OP{}", word.opcode()));
                        let data = match ptr {
                            Some(p) => p.get(&self.lookup, &self.table)?,
                            None => word.data(),
                        };
                        let show_data =
                            data != 0 || ptr.is_some() || self.set.imm_required(word.opcode());
                        lines.push(Line::Inst {
                            name,
                            data: show_data.then_some(data),
                            ptr: ptr_name,
                            comment,
                        });
                    }
                }
            }
        }
        Ok(lines)
    }

    /// Human-readable listing, one line per emitted word plus `name:` lines
    /// for live marks. Raw words render as `HERE value`.
    pub fn to_assembly(&self, comments: bool) -> Result<String> {
        let mut out = String::new();
        for line in self.assembly_lines(comments)? {
            match line {
                Line::Mark(name) => {
                    let _ = writeln!(out, "{name}:");
                }
                Line::Raw {
                    value,
                    ptr,
                    comment,
                } => {
                    let _ = write!(out, "HERE {value}");
                    if let Some(ptr) = ptr {
                        let _ = write!(out, ", {ptr}");
                    }
                    if let Some(comment) = comment {
                        let _ = write!(out, ", {comment}");
                    }
                    out.push('\n');
                }
                Line::Inst {
                    name,
                    data,
                    ptr,
                    comment,
                } => {
                    let _ = write!(out, "{name}");
                    if let Some(data) = data {
                        let _ = write!(out, " {data}");
                    }
                    if let Some(ptr) = ptr {
                        let _ = write!(out, ", {ptr}");
                    }
                    if let Some(comment) = comment {
                        let _ = write!(out, ", {comment}");
                    }
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }

    /// Colorized variant of [`Program::to_assembly`] for terminal output.
    pub fn cformat_assembly(&self, comments: bool) -> Result<String> {
        let mut out = String::new();
        for line in self.assembly_lines(comments)? {
            match line {
                Line::Mark(name) => {
                    out.push_str(&cformat!("<cyan>{name}:</>\n"));
                }
                Line::Raw {
                    value,
                    ptr,
                    comment,
                } => {
                    out.push_str(&cformat!("<magenta>HERE</> <yellow>{value}</>"));
                    if let Some(ptr) = ptr {
                        out.push_str(&cformat!(", <cyan>{ptr}</>"));
                    }
                    if let Some(comment) = comment {
                        out.push_str(&cformat!(", <green>{comment}</>"));
                    }
                    out.push('\n');
                }
                Line::Inst {
                    name,
                    data,
                    ptr,
                    comment,
                } => {
                    out.push_str(&cformat!("<blue>{name}</>"));
                    if let Some(data) = data {
                        out.push_str(&cformat!(" <yellow>{data}</>"));
                    }
                    if let Some(ptr) = ptr {
                        out.push_str(&cformat!(", <cyan>{ptr}</>"));
                    }
                    if let Some(comment) = comment {
                        out.push_str(&cformat!(", <green>{comment}</>"));
                    }
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }
}

enum Line {
    Mark(String),
    Raw {
        value: u16,
        ptr: Option<String>,
        comment: Option<String>,
    },
    Inst {
        name: String,
        data: Option<u16>,
        ptr: Option<String>,
        comment: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::{AssemblyList, Operand};
    use crate::pointer::Pointer;

    #[test]
    fn undefined_label_is_an_error() {
        let mut list = AssemblyList::default();
        let label = list.create_label(Some("nowhere"));
        list.emit_raw(Operand::Ptr(Pointer::Label(label)));
        let prog = list.build(0);
        assert_eq!(
            prog.to_words(),
            Err(Error::UndefinedLabel("nowhere".into()))
        );
    }

    #[test]
    fn invalid_item_is_an_error() {
        let mut list = AssemblyList::default();
        let mut prog = list.build(0);
        prog.items.push(AssemblyItem::Inst {
            word: None,
            ptr: None,
            raw: false,
            comment: None,
        });
        assert_eq!(prog.to_words(), Err(Error::InvalidInstruction));
    }

    #[test]
    fn rom_hex_pads_to_min_size() {
        let mut list = AssemblyList::default();
        list.emit("LDIA", Operand::Data(5), None).unwrap();
        list.emit("HLT", Operand::Data(0), None).unwrap();
        let prog = list.build(0);

        let rom = prog.to_rom_hex(16).unwrap();
        let mut lines = rom.lines();
        assert_eq!(lines.next(), Some(ROM_HEADER));
        assert_eq!(
            lines.next(),
            Some("000: 2005 f800 0000 0000 0000 0000 0000 0000")
        );
        assert_eq!(
            lines.next(),
            Some("008: 0000 0000 0000 0000 0000 0000 0000 0000")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn flat_hex_format() {
        let mut list = AssemblyList::default();
        list.emit("LDIA", Operand::Data(5), None).unwrap();
        list.emit_raw(Operand::Data(0xBEEF));
        let prog = list.build(0);

        let hex = prog.to_hex().unwrap();
        assert_eq!(hex, format!("{HEX_HEADER}\n2005\nbeef\n"));
    }

    #[test]
    fn listing_shows_marks_and_raw_words() {
        let mut list = AssemblyList::default();
        let label = list.create_label(Some("start"));
        list.mark(label);
        list.emit("LDIA", Operand::Data(7), None).unwrap();
        list.set_comment("counter");
        list.emit("JMP", Operand::Data(0), None).unwrap();
        list.emit_raw(Operand::Ptr(Pointer::Label(label)));
        let prog = list.build(0);

        let asm = prog.to_assembly(true).unwrap();
        assert_eq!(asm, "start:\nLDIA 7, counter\nJMP\nHERE 0, start\n");
    }

    #[test]
    fn pointer_data_lands_in_immediate() {
        let mut list = AssemblyList::default();
        let label = list.create_label(None);
        list.emit("STA", Operand::Ptr(Pointer::Label(label)), None)
            .unwrap();
        list.emit("ADD", Operand::Data(0), None).unwrap();
        list.mark(label);
        list.emit("HLT", Operand::Data(0), None).unwrap();
        let prog = list.build(0);

        let words = prog.to_words().unwrap();
        // STA with the mark's address (2) in the low 11 bits
        assert_eq!(words[0], (6 << 11) | 2);
    }

    #[test]
    fn disassemble_names_known_opcodes() {
        let set = arch::isa::default_set();
        let text = disassemble(&[0x2005, 0xF800], set);
        assert_eq!(text, "0000: LDIA 5\n0001: HLT\n");

        let empty = InstSet::new();
        assert_eq!(disassemble(&[0x1234], &empty), "0000: HERE 4660\n");
    }

    #[test]
    fn copy_to_honors_offset() {
        let mut list = AssemblyList::default();
        list.emit("LDIA", Operand::Data(1), None).unwrap();
        list.emit("HLT", Operand::Data(0), None).unwrap();
        let prog = list.build(4);

        let mut buf = [0u16; 8];
        prog.copy_to(&mut buf).unwrap();
        assert_eq!(buf[4], (4 << 11) | 1);
        assert_eq!(buf[5], 31 << 11);
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn copy_to_rejects_short_buffer() {
        let mut list = AssemblyList::default();
        list.emit("LDIA", Operand::Data(1), None).unwrap();
        list.emit("HLT", Operand::Data(0), None).unwrap();
        let prog = list.build(4);

        let mut buf = [0u16; 5];
        assert_eq!(
            prog.copy_to(&mut buf),
            Err(Error::ImageOverflow { need: 6, have: 5 })
        );
    }

    fn strip_ansi(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn colored_listing_matches_plain_structure() {
        let mut list = AssemblyList::default();
        let label = list.create_label(Some("start"));
        list.mark(label);
        list.emit("LDIA", Operand::Data(7), None).unwrap();
        list.set_comment("counter");
        list.emit_raw(Operand::Ptr(Pointer::Label(label)));
        let prog = list.build(0);

        let plain = prog.to_assembly(true).unwrap();
        let colored = prog.cformat_assembly(true).unwrap();
        assert_eq!(strip_ansi(&colored), plain);
    }
}
