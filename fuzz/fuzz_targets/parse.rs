#![no_main]

use casper_syntax::{lexer, parser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if let Ok(tokens) = lexer::lex(source) {
            if let Ok(program) = parser::parse(&tokens) {
                // Recovered errors must carry spans inside the source
                for error in &program.recovered {
                    assert!(error.span.start <= source.len());
                }
            }
        }
        // Located errors must land on a real line
        if let Err(error) = parser::parse_source(source) {
            assert!(error.line >= 1);
        }
    }
});
