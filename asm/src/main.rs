use clap::Parser;
use color_print::cformat;
use std::fs;

use a8asm::emit::{disassemble, rom_hex, HEX_HEADER};

fn main() {
    let args: AppArgs = AppArgs::parse();
    println!("Astro-8 Assembly Tool");

    println!("----------------------------------------------------");
    println!("1. Load Image: ");
    println!("  - {}", args.input);
    let text = fs::read_to_string(&args.input)
        .expect(&cformat!("<red,bold>Cannot Open File</>: {}", args.input));
    let words: Vec<u16> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != HEX_HEADER)
        .map(|line| {
            u16::from_str_radix(line, 16)
                .expect(&cformat!("<red,bold>Bad Hex Word</>: {}", line))
        })
        .collect();
    println!("  - #{} words", words.len());

    println!("2. Disassemble: ");
    let set = arch::isa::default_set();
    print!("{}", disassemble(&words, set));

    println!("3. Output ROM Image: ");
    let rom = rom_hex(&words, args.min_size);
    fs::write(&args.output, rom)
        .expect(&cformat!("<red,bold>Cannot Write File</>: {}", args.output));
    println!("  - {}", args.output);

    println!("----------------------------------------------------");
}

#[derive(Parser, Debug)]
#[clap(
    name = "Astro-8 Assembly Tool",
    version = "v0.1.0",
    about = "Disassemble AEXE images and re-emit them as ROM hex"
)]
struct AppArgs {
    #[clap()]
    input: String,
    #[clap(short = 'o', long = "output", default_value = "out.rom.hex")]
    output: String,
    #[clap(long = "min-size", default_value_t = 0)]
    min_size: usize,
}
