use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use lox_core::Scanner;
use lox_interpreter::interpreter::Interpreter;
use lox_interpreter::parser::Parser;
use lox_interpreter::resolver::Resolver;

fn benchmark(c: &mut Criterion) {
    let src = include_str!("../tests/programs/fib.lox");

    c.bench_function("fib 20", |b| {
        b.iter(|| {
            let tokens = Scanner::new(src).scan_tokens().unwrap();
            let parsed = Parser::new(&tokens).parse().unwrap();

            let mut interpreter = Interpreter::new(Rc::new(RefCell::new(io::sink())));
            let mut resolver = Resolver::new(&mut interpreter);
            let resolved = resolver.resolve(parsed).unwrap();
            interpreter.interpret(&resolved).unwrap();
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
