use gomorph_syntax::lexer::{unquote, Lexer, Tok};
use proptest::prelude::*;

fn injected_semis(input: &str) -> Vec<usize> {
    Lexer::new(input)
        .filter_map(|(s, t, e)| (matches!(t, Tok::Semi) && s == e).then_some(s))
        .collect()
}

fn tok_name(t: &Tok<'_>) -> &'static str {
    match t {
        Tok::Ident(_) => "IDENT",
        Tok::IntLit(_) => "INT",
        Tok::FloatLit(_) => "FLOAT",
        Tok::ImagLit(_) => "IMAG",
        Tok::RuneLit(_) => "CHAR",
        Tok::StringLit(_) | Tok::RawStringLit(_) => "STRING",
        Tok::Semi => ";",
        Tok::Inc => "++",
        Tok::Dec => "--",
        Tok::RParen => ")",
        Tok::RBrack => "]",
        Tok::RBrace => "}",
        Tok::LBrace => "{",
        Tok::LParen => "(",
        Tok::Plus => "+",
        Tok::Comma => ",",
        Tok::KwBreak => "break",
        Tok::KwContinue => "continue",
        Tok::KwFallthrough => "fallthrough",
        Tok::KwReturn => "return",
        Tok::KwFunc => "func",
        Tok::KwIf => "if",
        Tok::KwPackage => "package",
        _ => "OTHER",
    }
}

fn lex_names(input: &str) -> String {
    Lexer::new(input)
        .map(|(_, t, _)| tok_name(&t))
        .collect::<Vec<_>>()
        .join(" ")
}

struct SemiCase {
    input: &'static str,
    want: &'static str,
}

#[rustfmt::skip]
const SEMICOLON_TESTS: &[SemiCase] = &[
    SemiCase { input: "", want: "" },
    SemiCase { input: ";", want: ";" },
    SemiCase { input: "foo\n", want: "IDENT ;" },
    SemiCase { input: "123\n", want: "INT ;" },
    SemiCase { input: "1.2\n", want: "FLOAT ;" },
    SemiCase { input: "'x'\n", want: "CHAR ;" },
    SemiCase { input: "\"x\"\n", want: "STRING ;" },
    SemiCase { input: "`x`\n", want: "STRING ;" },
    SemiCase { input: "+\n", want: "+" },
    SemiCase { input: "++\n", want: "++ ;" },
    SemiCase { input: "--\n", want: "-- ;" },
    SemiCase { input: "(\n", want: "(" },
    SemiCase { input: "{\n", want: "{" },
    SemiCase { input: ",\n", want: "," },
    SemiCase { input: ")\n", want: ") ;" },
    SemiCase { input: "]\n", want: "] ;" },
    SemiCase { input: "}\n", want: "} ;" },
    SemiCase { input: "break\n", want: "break ;" },
    SemiCase { input: "continue\n", want: "continue ;" },
    SemiCase { input: "fallthrough\n", want: "fallthrough ;" },
    SemiCase { input: "return\n", want: "return ;" },
    SemiCase { input: "func\n", want: "func" },
    SemiCase { input: "if\n", want: "if" },
    SemiCase { input: "foo//comment\n", want: "IDENT ;" },
    SemiCase { input: "foo/*comment*/\n", want: "IDENT ;" },
    SemiCase { input: "foo/*\n*/", want: "IDENT ;" },
    SemiCase { input: "foo    // comment", want: "IDENT ;" },
    SemiCase { input: "package main", want: "package IDENT ;" },
];

#[test]
fn semicolon_insertion_table() {
    for t in SEMICOLON_TESTS {
        assert_eq!(lex_names(t.input), t.want, "input={:?}", t.input);

        // trailing newlines do not change the token stream
        let mut trimmed = t.input;
        while let Some(s) = trimmed.strip_suffix('\n') {
            trimmed = s;
            assert_eq!(lex_names(trimmed), t.want, "input={trimmed:?}");
        }
    }
}

#[test]
fn semicolon_insertion_crlf_and_comments() {
    assert_eq!(injected_semis("x\r\ny"), vec![1, 4]);
    assert_eq!(injected_semis("x/*\r*/y"), vec![3, 7]);
    assert_eq!(injected_semis("if/*\n*/x"), vec![8]);
    assert_eq!(injected_semis("x++\ny"), vec![3, 5]);
    assert_eq!(injected_semis("1i\nx"), vec![2, 4]);
}

#[test]
fn comments_are_collected_with_trailing_flag() {
    let src = "// head\npackage p // tail\n/* block */\n";
    let mut lx = Lexer::new(src);
    let _: Vec<_> = lx.by_ref().collect();
    let comments = lx.take_comments();
    let got: Vec<(&str, bool, bool)> = comments
        .iter()
        .map(|c| (c.text, c.block, c.trailing))
        .collect();
    assert_eq!(
        got,
        vec![
            ("// head", false, false),
            ("// tail", false, true),
            ("/* block */", true, false),
        ]
    );
}

#[test]
fn unquote_interpreted_strings() {
    let cases: &[(&str, &[u8])] = &[
        (r#""abc""#, b"abc"),
        (r#""\n\t""#, b"\n\t"),
        (r#""\x41\101""#, b"AA"),
        (r#""é""#, "é".as_bytes()),
        (r#""\U0001F600""#, "😀".as_bytes()),
        (r#""\xff""#, &[0xff]),
        (r#""\"q\"""#, b"\"q\""),
    ];
    for (raw, want) in cases {
        assert_eq!(unquote::string(raw).unwrap(), *want, "{raw}");
    }
}

#[test]
fn unquote_raw_strings_drop_carriage_returns() {
    assert_eq!(unquote::string("`a\r\nb`").unwrap(), b"a\nb");
    assert_eq!(unquote::string(r"`\n`").unwrap(), br"\n");
}

#[test]
fn unquote_rejects_bad_escapes() {
    assert!(unquote::string(r#""\q""#).is_err());
    assert!(unquote::string(r#""\x4""#).is_err());
    assert!(unquote::string(r#""\'""#).is_err());
    assert!(unquote::rune(r"'\400'").is_err());
}

#[test]
fn unquote_runes() {
    assert_eq!(unquote::rune("'a'").unwrap(), 'a' as u32);
    assert_eq!(unquote::rune(r"'\n'").unwrap(), 10);
    assert_eq!(unquote::rune(r"'\''").unwrap(), '\'' as u32);
    assert_eq!(unquote::rune("'世'").unwrap(), '世' as u32);
    assert!(unquote::rune("'ab'").is_err());
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn never_panics_and_progresses(s in ".*") {
        let mut last_real_end = 0usize;
        let max_steps = s.len().saturating_mul(4) + 64;

        for (steps, (start, tok, end)) in Lexer::new(&s).enumerate() {
            prop_assert!(start <= end);
            prop_assert!(end <= s.len());
            let injected = matches!(tok, Tok::Semi) && start == end;
            if !injected {
                prop_assert!(start >= last_real_end, "token moved backwards in {s:?}");
                last_real_end = end;
            }
            prop_assert!(steps <= max_steps, "possible hang on {s:?}");
        }
    }

    #[test]
    fn quoted_ascii_round_trips(s in "[ -~]{0,40}") {
        let quoted = format!("{s:?}");
        // Rust's Debug escapes are a subset of Go's for printable ASCII
        prop_assert_eq!(unquote::string(&quoted).unwrap(), s.as_bytes());
    }
}
