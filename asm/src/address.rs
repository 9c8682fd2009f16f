use once_cell::unsync::OnceCell;

use crate::pointer::Pointer;

/// What the words behind an address mean to the surrounding language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    String,
    Pointer,
}

/// How a file's bytes are packed into words. Keys the file registry, so the
/// same path loaded two ways yields two addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Byte,
    Font,
}

/// Loaded file data. `offset` is the index of the word the file's pointer
/// should address, past any loader-specific header words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub offset: usize,
    pub words: Vec<u16>,
}

/// Packs raw bytes into image words for one [`FileKind`].
pub trait FileLoader {
    fn kind(&self) -> FileKind;
    fn load(&self, bytes: &[u8]) -> FileContent;
}

/// Default loader: a length word, then two bytes per word, high byte first.
pub struct ByteLoader;

impl FileLoader for ByteLoader {
    fn kind(&self) -> FileKind {
        FileKind::Byte
    }

    fn load(&self, bytes: &[u8]) -> FileContent {
        let mut words = Vec::with_capacity(1 + bytes.len().div_ceil(2));
        words.push(bytes.len() as u16);
        for pair in bytes.chunks(2) {
            let hi = u16::from(pair[0]) << 8;
            let lo = pair.get(1).copied().map(u16::from).unwrap_or(0);
            words.push(hi | lo);
        }
        FileContent { offset: 1, words }
    }
}

/// Content reachable through a pointer: an interned string literal, lazily
/// loaded file data, or a bare cell. The builder emits string and file words
/// into the data section and marks each address's pointer there.
#[derive(Debug)]
pub enum Address {
    Str {
        pointer: Pointer,
        value: String,
    },
    File {
        pointer: Pointer,
        kind: FileKind,
        path: String,
        content: OnceCell<FileContent>,
    },
    Raw {
        pointer: Pointer,
        value_type: ValueType,
        len: Option<usize>,
    },
}

impl Address {
    pub fn pointer(&self) -> &Pointer {
        match self {
            Address::Str { pointer, .. }
            | Address::File { pointer, .. }
            | Address::Raw { pointer, .. } => pointer,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Address::Str { .. } => ValueType::String,
            Address::File { .. } => ValueType::Pointer,
            Address::Raw { value_type, .. } => *value_type,
        }
    }

    /// Word count behind the pointer, if known. Unloaded files have no
    /// length yet; bare regions carry whatever the caller knew, which may
    /// be nothing.
    pub fn len(&self) -> Option<usize> {
        match self {
            Address::Str { value, .. } => Some(value.chars().count() + 1),
            Address::File { content, .. } => {
                content.get().map(|c| c.words.len() - c.offset)
            }
            Address::Raw { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Constant-fold one word of the content. Strings map through the
    /// character table and end with the 0xFFFF terminator; files index into
    /// their loaded words; bare cells have no known value.
    pub fn get(&self, offset: usize) -> Option<u16> {
        match self {
            Address::Str { value, .. } => {
                let chars: Vec<char> = value.chars().collect();
                match chars.get(offset) {
                    Some(c) => arch::charset::char_to_code(*c),
                    None if offset == chars.len() => Some(0xFFFF),
                    None => None,
                }
            }
            Address::File { content, .. } => {
                let content = content.get()?;
                content.words.get(content.offset + offset).copied()
            }
            Address::Raw { .. } => None,
        }
    }

    /// Inject loaded file data. Returns `false` for non-file addresses and
    /// for files already loaded.
    pub fn set_content(&self, loaded: FileContent) -> bool {
        match self {
            Address::File { content, .. } => content.set(loaded).is_ok(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_folding() {
        let addr = Address::Str {
            pointer: Pointer::absolute(0, 0),
            value: "ab".into(),
        };
        assert_eq!(addr.value_type(), ValueType::String);
        assert_eq!(addr.len(), Some(3));
        assert_eq!(addr.get(0), arch::charset::char_to_code('a'));
        assert_eq!(addr.get(1), arch::charset::char_to_code('b'));
        assert_eq!(addr.get(2), Some(0xFFFF));
        assert_eq!(addr.get(3), None);
    }

    #[test]
    fn byte_loader_packs_pairs() {
        let content = ByteLoader.load(&[0x12, 0x34, 0x56]);
        assert_eq!(content.offset, 1);
        assert_eq!(content.words, vec![3, 0x1234, 0x5600]);
    }

    #[test]
    fn file_length_appears_after_load() {
        let addr = Address::File {
            pointer: Pointer::absolute(0, 0),
            kind: FileKind::Byte,
            path: "logo.bin".into(),
            content: OnceCell::new(),
        };
        assert_eq!(addr.len(), None);
        assert_eq!(addr.get(0), None);

        assert!(addr.set_content(ByteLoader.load(&[1, 2])));
        assert_eq!(addr.len(), Some(1));
        assert_eq!(addr.get(0), Some(0x0102));
        assert!(!addr.set_content(ByteLoader.load(&[9])));
    }

    #[test]
    fn raw_has_no_foldable_value() {
        let addr = Address::Raw {
            pointer: Pointer::absolute(7, 0),
            value_type: ValueType::Integer,
            len: Some(1),
        };
        assert_eq!(addr.value_type(), ValueType::Integer);
        assert_eq!(addr.len(), Some(1));
        assert_eq!(addr.get(0), None);
    }

    #[test]
    fn raw_keeps_caller_supplied_type_and_length() {
        // a cast to a region of unknown extent
        let unknown = Address::Raw {
            pointer: Pointer::absolute(0x40, 0),
            value_type: ValueType::Pointer,
            len: None,
        };
        assert_eq!(unknown.value_type(), ValueType::Pointer);
        assert_eq!(unknown.len(), None);
        assert_eq!(unknown.get(0), None);

        let block = Address::Raw {
            pointer: Pointer::absolute(0x80, 0),
            value_type: ValueType::Integer,
            len: Some(16),
        };
        assert_eq!(block.len(), Some(16));
    }
}
