mod ast;
mod codegen;
mod error;
mod parser;
mod scanner;

use crate::error::Error;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct CliOpt {
    /// path to the NanoMorpho source file
    #[structopt(parse(from_os_str))]
    source: PathBuf,

    /// write the assembly here instead of stdout
    #[structopt(short = "o", parse(from_os_str))]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let opt = CliOpt::from_args();
    let source = std::fs::read_to_string(&opt.source).expect("read_to_string");
    let name = opt
        .source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("out");

    match compile(name, &source) {
        Ok(asm) => match &opt.output {
            Some(path) => std::fs::write(path, asm).expect("write"),
            None => print!("{}", asm),
        },
        Err(err) => {
            eprintln!("[error] {}", err);
            std::process::exit(1);
        }
    }
}

pub fn compile(name: &str, source: &str) -> Result<String, Error> {
    let mut scanner = scanner::Scanner::new(source)?;
    let program = parser::parse(&mut scanner)?;
    codegen::CodeGen::new().program(name, &program)
}
