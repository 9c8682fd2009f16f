use a8asm::emit::{HEX_HEADER, ROM_HEADER};
use a8asm::Builder;
use arch::isa::OpKind;

fn w(kind: OpKind, data: u16) -> u16 {
    (u16::from(kind.id()) << 11) | data
}

fn counting_loop() -> Builder {
    let mut b = Builder::new();
    let counter = b.global("counter", 1);
    let top = b.create_label(Some("loop"));
    let done = b.create_label(Some("done"));

    b.set_a(0u16).unwrap();
    b.mark(top);
    b.set_b(1u16).unwrap();
    b.add().unwrap();
    b.store_ptr(&counter).unwrap();
    b.set_b(5u16).unwrap();
    b.sub().unwrap();
    b.jump_if_zero(done).unwrap();
    b.jump(top).unwrap();
    b.mark(done);
    b.halt().unwrap();
    b
}

#[test]
fn full_program_layout() {
    let mut b = counting_loop();
    // zero-size global adds no cell words
    let _counter2 = b.global("counter2", 0);
    let prog = b.build(0).unwrap();

    assert_eq!(
        prog.to_words().unwrap(),
        vec![
            w(OpKind::JMP, 0),
            3,
            0,
            w(OpKind::LDIA, 0),
            w(OpKind::LDIB, 1),
            w(OpKind::ADD, 0),
            w(OpKind::STA, 2),
            w(OpKind::LDIB, 5),
            w(OpKind::SUB, 0),
            w(OpKind::JMPZ, 0),
            13,
            w(OpKind::JMP, 0),
            4,
            w(OpKind::HLT, 0),
        ]
    );
}

#[test]
fn emitters_agree_on_the_image() {
    let mut b = counting_loop();
    let prog = b.build(0).unwrap();
    let words = prog.to_words().unwrap();

    let hex = prog.to_hex().unwrap();
    let mut lines = hex.lines();
    assert_eq!(lines.next(), Some(HEX_HEADER));
    let parsed: Vec<u16> = lines
        .map(|line| u16::from_str_radix(line, 16).unwrap())
        .collect();
    assert_eq!(parsed, words);

    let rom = prog.to_rom_hex(16).unwrap();
    let mut rom_lines = rom.lines();
    assert_eq!(rom_lines.next(), Some(ROM_HEADER));
    let rom_words: Vec<u16> = rom_lines
        .flat_map(|line| {
            line.split(':')
                .nth(1)
                .unwrap()
                .split_whitespace()
                .map(|word| u16::from_str_radix(word, 16).unwrap())
                .collect::<Vec<u16>>()
        })
        .collect();
    assert_eq!(&rom_words[..words.len()], &words[..]);
    assert!(rom_words[words.len()..].iter().all(|&word| word == 0));
    assert_eq!(rom_words.len(), 16);

    let mut buf = vec![0u16; words.len()];
    prog.copy_to(&mut buf).unwrap();
    assert_eq!(buf, words);
}

#[test]
fn listing_carries_marks_and_cells() {
    let mut b = counting_loop();
    let prog = b.build(0).unwrap();
    let asm = prog.to_assembly(true).unwrap();

    assert!(asm.contains("counter:\n"));
    assert!(asm.contains("loop:\n"));
    assert!(asm.contains("done:\n"));
    assert!(asm.contains("HERE 0"));
    assert!(asm.contains("HERE 13, done"));
    assert!(asm.contains("HERE 3, Program"));
}

#[test]
fn addresses_survive_a_base_offset() {
    let mut b = counting_loop();
    let counter = b.global("counter3", 1);
    let prog = b.build(100).unwrap();

    // cells sit right behind the two header words
    assert_eq!(b.address_of(&counter), Ok(103));
    assert_eq!(prog.offset(), 100);

    let words = prog.to_words().unwrap();
    let mut buf = vec![0u16; 100 + words.len()];
    prog.copy_to(&mut buf).unwrap();
    assert_eq!(&buf[100..], &words[..]);
    assert!(buf[..100].iter().all(|&word| word == 0));
}
