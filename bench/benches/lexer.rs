use bitc::{lexer, token::TokenKind};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

static METHOD: &str = "
@public
16 step_N(8 a, 8 b, 4 Flag c, ...) {
    16 acc = (a + b) * 3 - ~c;  # mixed precedence
    acc = acc ^ 2 | 8:c & b;
    print(acc, a, b);
    return acc % 7;
}
";

fn input() -> String {
    let mut src = String::from("object 256 Bench;\nimport Other;\n");
    for i in 0..512 {
        src.push_str(&METHOD.replace('N', &i.to_string()));
    }
    src
}

fn lexer(input: &str, tokens: &mut Vec<bitc::token::Token>) {
    lexer::lex(input, tokens).unwrap();
    let names = tokens
        .iter()
        .filter(|token| matches!(token.kind, TokenKind::Identifier(_)))
        .count();
    black_box(names);
}

fn criterion_benchmark(c: &mut Criterion) {
    let input = input();
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY * 4);

    c.bench_function("lexer", |b| {
        b.iter(|| {
            tokens.clear();
            lexer(black_box(&input), &mut tokens);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
