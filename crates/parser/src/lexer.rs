//! Go tokenizer: logos DFA plus a wrapper that performs automatic semicolon
//! insertion, classifies numeric literals and records comments.

use crate::ast::Span;
use crate::error::{Diag, LexError, LexErrorKind};
use logos::{Lexer as LogosLexer, Logos};
use std::ops::Range;

// =============================================================================
// 0. Shared helpers
// =============================================================================

#[inline(always)]
const fn first_newline_offset(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'\n' | b'\r') {
            return Some(i);
        }
        i += 1;
    }

    None
}

#[inline(always)]
pub const fn lower_ascii(b: u8) -> u8 {
    if b >= b'A' && b <= b'Z' {
        b + 32
    } else {
        b
    }
}

#[inline(always)]
pub const fn is_dec_digit(b: u8) -> bool {
    b >= b'0' && b <= b'9'
}

pub const HEX_LUT: [u8; 256] = {
    let mut t = [0xFFu8; 256];

    let mut i = b'0';
    while i <= b'9' {
        t[i as usize] = i - b'0';
        i += 1;
    }

    let mut i = b'a';
    while i <= b'f' {
        t[i as usize] = (i - b'a') + 10;
        t[(i - 32) as usize] = (i - b'a') + 10;
        i += 1;
    }

    t
};

#[inline(always)]
pub const fn is_hex_digit(b: u8) -> bool {
    HEX_LUT[b as usize] != 0xFF
}

#[inline(always)]
pub const fn is_valid_unicode_scalar(x: u32) -> bool {
    x <= 0x10_FFFF && !(x >= 0xD800 && x <= 0xDFFF)
}

// =============================================================================
// 1. Block comment scanner
// =============================================================================

#[inline]
fn lex_block_comment(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    let mut from = 0;

    while let Some(star) = memchr::memchr(b'*', &rem[from..]) {
        let at = from + star;
        if rem.get(at + 1) == Some(&b'/') {
            lex.bump(at + 2);
            return Ok(());
        }
        from = at + 1;
    }

    lex.bump(rem.len());
    Err(LexErrorKind::UnterminatedComment)
}

// =============================================================================
// 2. Literal decoding (strings and runes)
// =============================================================================

/// Decoding of quoted Go literals into their runtime value.
pub mod unquote {
    use super::{hex_value, is_valid_unicode_scalar};
    use crate::error::LexErrorKind;

    enum Escaped {
        /// `\xHH` and `\OOO` denote a single byte.
        Byte(u8),
        Char(u32),
    }

    /// Decodes one escape; `i` points just past the backslash.
    fn escape(body: &[u8], i: usize, quote: u8) -> Result<(Escaped, usize), LexErrorKind> {
        let c = *body.get(i).ok_or(LexErrorKind::InvalidEscape)?;
        let simple =
            |v: u8| -> Result<(Escaped, usize), LexErrorKind> { Ok((Escaped::Char(v as u32), 1)) };
        match c {
            b'a' => simple(0x07),
            b'b' => simple(0x08),
            b'f' => simple(0x0C),
            b'n' => simple(b'\n'),
            b'r' => simple(b'\r'),
            b't' => simple(b'\t'),
            b'v' => simple(0x0B),
            b'\\' => simple(b'\\'),
            b'\'' | b'"' if c == quote => simple(c),
            b'x' | b'u' | b'U' => {
                let width = match c {
                    b'x' => 2,
                    b'u' => 4,
                    _ => 8,
                };
                let digits = body
                    .get(i + 1..i + 1 + width)
                    .ok_or(LexErrorKind::InvalidEscape)?;
                let mut v = 0u32;
                for &d in digits {
                    let hv = hex_value(d).ok_or(LexErrorKind::InvalidEscape)?;
                    v = (v << 4) | hv;
                }
                if c == b'x' {
                    return Ok((Escaped::Byte(v as u8), 1 + width));
                }
                if !is_valid_unicode_scalar(v) {
                    return Err(LexErrorKind::InvalidEscape);
                }
                Ok((Escaped::Char(v), 1 + width))
            }
            b'0'..=b'7' => {
                let digits = body.get(i..i + 3).ok_or(LexErrorKind::InvalidEscape)?;
                let mut v = 0u32;
                for &d in digits {
                    if !(b'0'..=b'7').contains(&d) {
                        return Err(LexErrorKind::InvalidEscape);
                    }
                    v = v * 8 + (d - b'0') as u32;
                }
                if v > 255 {
                    return Err(LexErrorKind::InvalidEscape);
                }
                Ok((Escaped::Byte(v as u8), 3))
            }
            _ => Err(LexErrorKind::InvalidEscape),
        }
    }

    fn push_char(out: &mut Vec<u8>, cp: u32) {
        let ch = char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }

    /// Byte value of an interpreted (`"..."`) or raw (`` `...` ``) string literal.
    pub fn string(raw: &str) -> Result<Vec<u8>, LexErrorKind> {
        let bytes = raw.as_bytes();
        if bytes.len() < 2 || bytes[0] != bytes[bytes.len() - 1] {
            return Err(LexErrorKind::InvalidToken);
        }
        let body = &bytes[1..bytes.len() - 1];

        match bytes[0] {
            // Carriage returns are discarded from raw literals.
            b'`' => Ok(body.iter().copied().filter(|&b| b != b'\r').collect()),
            b'"' => {
                let mut out = Vec::with_capacity(body.len());
                let mut i = 0;
                while i < body.len() {
                    if body[i] != b'\\' {
                        out.push(body[i]);
                        i += 1;
                        continue;
                    }
                    let (esc, used) = escape(body, i + 1, b'"')?;
                    match esc {
                        Escaped::Byte(b) => out.push(b),
                        Escaped::Char(cp) => push_char(&mut out, cp),
                    }
                    i += 1 + used;
                }
                Ok(out)
            }
            _ => Err(LexErrorKind::InvalidToken),
        }
    }

    /// Code point of a rune literal.
    pub fn rune(raw: &str) -> Result<u32, LexErrorKind> {
        let inner = raw
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .ok_or(LexErrorKind::InvalidToken)?;
        let body = inner.as_bytes();

        if body.first() == Some(&b'\\') {
            let (esc, used) = escape(body, 1, b'\'')?;
            if 1 + used != body.len() {
                return Err(LexErrorKind::InvalidToken);
            }
            return Ok(match esc {
                Escaped::Byte(b) => b as u32,
                Escaped::Char(cp) => cp,
            });
        }

        let mut chars = inner.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c != '\n' && c != '\r' => Ok(c as u32),
            _ => Err(LexErrorKind::InvalidToken),
        }
    }
}

#[inline(always)]
const fn hex_value(b: u8) -> Option<u32> {
    match HEX_LUT[b as usize] {
        0xFF => None,
        v => Some(v as u32),
    }
}

fn validate_string(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    unquote::string(lex.slice()).map(|_| ())
}

fn validate_rune(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    unquote::rune(lex.slice()).map(|_| ())
}

// =============================================================================
// 3. Numbers
// =============================================================================

mod num {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum NumKind {
        Int,
        Float,
    }

    struct Digits {
        end: usize,
        count: usize,
        max: u8,
    }

    /// Consumes `[digit | _]*`; an underscore must sit between digits, or
    /// directly after a base prefix when `after_prefix` is set.
    fn scan_digits(
        s: &[u8],
        start: usize,
        hex: bool,
        after_prefix: bool,
    ) -> Result<Digits, LexErrorKind> {
        let mut i = start;
        let mut count = 0;
        let mut max = 0u8;
        let mut prev_digit = after_prefix;

        while i < s.len() {
            let b = s[i];
            if b == b'_' {
                if !prev_digit {
                    return Err(LexErrorKind::InvalidNumber);
                }
                prev_digit = false;
            } else {
                let v = match (hex, HEX_LUT[b as usize]) {
                    (true, v) if v != 0xFF => v,
                    (false, v) if v < 10 => v,
                    _ => break,
                };
                max = max.max(v);
                count += 1;
                prev_digit = true;
            }
            i += 1;
        }

        if i > start && s[i - 1] == b'_' {
            return Err(LexErrorKind::InvalidNumber);
        }
        Ok(Digits { end: i, count, max })
    }

    fn skip_sign(s: &[u8], i: usize) -> usize {
        match s.get(i) {
            Some(b'+' | b'-') => i + 1,
            _ => i,
        }
    }

    fn classify_hex(lit: &[u8]) -> Result<NumKind, LexErrorKind> {
        let n = lit.len();
        let mant = scan_digits(lit, 2, true, true)?;
        let mut i = mant.end;
        let mut digits = mant.count;
        let mut dotted = false;

        if i < n && lit[i] == b'.' {
            dotted = true;
            let frac = scan_digits(lit, i + 1, true, false)?;
            digits += frac.count;
            i = frac.end;
        }
        if digits == 0 {
            return Err(LexErrorKind::InvalidNumber);
        }

        let kind = if i < n && lower_ascii(lit[i]) == b'p' {
            let exp = scan_digits(lit, skip_sign(lit, i + 1), false, false)?;
            if exp.count == 0 {
                return Err(LexErrorKind::InvalidNumber);
            }
            i = exp.end;
            NumKind::Float
        } else if dotted {
            // hex mantissa requires a 'p' exponent
            return Err(LexErrorKind::InvalidNumber);
        } else {
            NumKind::Int
        };

        if i != n {
            return Err(LexErrorKind::InvalidNumber);
        }
        Ok(kind)
    }

    fn classify_based(lit: &[u8], base: u8) -> Result<NumKind, LexErrorKind> {
        let d = scan_digits(lit, 2, false, true)?;
        if d.count == 0 || d.end != lit.len() || d.max >= base {
            return Err(LexErrorKind::InvalidNumber);
        }
        Ok(NumKind::Int)
    }

    /// Validates a numeric literal (without imaginary suffix).
    pub fn classify_number(lit: &[u8]) -> Result<NumKind, LexErrorKind> {
        let n = lit.len();
        if n >= 2 && lit[0] == b'0' {
            match lower_ascii(lit[1]) {
                b'x' => return classify_hex(lit),
                b'b' => return classify_based(lit, 2),
                b'o' => return classify_based(lit, 8),
                _ => {}
            }
        }

        let int = scan_digits(lit, 0, false, false)?;
        let mut i = int.end;
        let mut float = false;

        if i < n && lit[i] == b'.' {
            float = true;
            let frac = scan_digits(lit, i + 1, false, false)?;
            if int.count == 0 && frac.count == 0 {
                return Err(LexErrorKind::InvalidNumber);
            }
            i = frac.end;
        }

        if i < n && lower_ascii(lit[i]) == b'e' {
            float = true;
            let exp = scan_digits(lit, skip_sign(lit, i + 1), false, false)?;
            if exp.count == 0 {
                return Err(LexErrorKind::InvalidNumber);
            }
            i = exp.end;
        }

        if i != n || (int.count == 0 && !float) {
            return Err(LexErrorKind::InvalidNumber);
        }
        // legacy octal: 0755
        if !float && n > 1 && lit[0] == b'0' && int.max > 7 {
            return Err(LexErrorKind::InvalidNumber);
        }

        Ok(if float { NumKind::Float } else { NumKind::Int })
    }

    /// Decimal digits with valid underscores; `0789i` is a legal imaginary literal.
    pub fn is_decimal_digits(lit: &[u8]) -> bool {
        matches!(scan_digits(lit, 0, false, false), Ok(d) if d.count > 0 && d.end == lit.len())
    }

    /// Logos callback: maximal munch over the number token.
    ///
    /// Malformed spellings (`0b2`, `09`) stay a single token and are rejected
    /// by `classify_number`.
    pub fn lex_number(lex: &mut LogosLexer<'_, super::RawTok>) -> Result<(), LexErrorKind> {
        let src = lex.source().as_bytes();
        let start = lex.span().start;
        let hex = src.get(start) == Some(&b'0') && matches!(src.get(start + 1), Some(b'x' | b'X'));
        let mut i = start + if hex { 2 } else { 0 };

        while i < src.len() {
            let b = src[i];
            let lb = lower_ascii(b);
            if (hex && lb == b'p') || (!hex && lb == b'e') {
                i = skip_sign(src, i + 1);
                continue;
            }
            if b == b'.' {
                // don't steal ".." / "..."
                if src.get(i + 1) == Some(&b'.') {
                    break;
                }
                i += 1;
                continue;
            }
            if b == b'_' || (b.is_ascii_alphanumeric() && lb != b'i') {
                i += 1;
                continue;
            }
            break;
        }

        let already = lex.span().end;
        if i > already {
            lex.bump(i - already);
        }
        Ok(())
    }
}

pub use num::NumKind;

/// Validates a numeric literal's spelling (the `i` suffix included).
pub fn classify_number(lit: &str) -> Result<NumKind, LexErrorKind> {
    num::classify_number(lit.as_bytes())
}

// =============================================================================
// 4. Token Definition (RawTok - DFA optimized for logos)
// =============================================================================

#[repr(u8)]
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t]+")]
#[rustfmt::skip]
enum RawTok {
    #[token("\u{FEFF}")] Bom,

    // Trivia
    #[regex(r"\r\n|\n|\r")] Newline,
    #[regex(r"//[^\n\r]*", allow_greedy = true)] LineComment,
    #[token("/*", lex_block_comment)]
    BlockComment,

    // Keywords (before Ident)
    #[token("break")] KwBreak,
    #[token("case")] KwCase,
    #[token("chan")] KwChan,
    #[token("const")] KwConst,
    #[token("continue")] KwContinue,
    #[token("default")] KwDefault,
    #[token("defer")] KwDefer,
    #[token("else")] KwElse,
    #[token("fallthrough")] KwFallthrough,
    #[token("for")] KwFor,
    #[token("func")] KwFunc,
    #[token("go")] KwGo,
    #[token("goto")] KwGoto,
    #[token("if")] KwIf,
    #[token("import")] KwImport,
    #[token("interface")] KwInterface,
    #[token("map")] KwMap,
    #[token("package")] KwPackage,
    #[token("range")] KwRange,
    #[token("return")] KwReturn,
    #[token("select")] KwSelect,
    #[token("struct")] KwStruct,
    #[token("switch")] KwSwitch,
    #[token("type")] KwType,
    #[token("var")] KwVar,

    #[regex(r"[_\p{L}][_\p{L}\p{Nd}]*")] Ident,

    #[regex(r"[0-9]|\.[0-9]", num::lex_number)] Number,

    #[regex(r"`[^`]*`")] RawString,
    #[regex(r#""([^"\\\n\r]|\\.)*""#, validate_string)] String,
    #[regex(r"'([^'\\\n\r]|\\.)+'", validate_rune)] Rune,

    // Operators
    #[token("...")] Ellipsis,
    #[token("<<=")] ShlAssign,
    #[token(">>=")] ShrAssign,
    #[token("&^=")] AndNotAssign,
    #[token("+=")] AddAssign,
    #[token("-=")] SubAssign,
    #[token("*=")] MulAssign,
    #[token("/=")] DivAssign,
    #[token("%=")] ModAssign,
    #[token("&=")] AndAssign,
    #[token("|=")] OrAssign,
    #[token("^=")] XorAssign,
    #[token("<<")] Shl,
    #[token(">>")] Shr,
    #[token("&^")] AndNot,
    #[token("&&")] LAnd,
    #[token("||")] LOr,
    #[token("==")] EqEq,
    #[token("!=")] NotEq,
    #[token("<=")] Le,
    #[token(">=")] Ge,
    #[token("++")] Inc,
    #[token("--")] Dec,
    #[token(":=")] Define,
    #[token("<-")] Arrow,
    #[token("=")] Assign,
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("*")] Star,
    #[token("/")] Slash,
    #[token("%")] Percent,
    #[token("&")] Amp,
    #[token("|")] Pipe,
    #[token("^")] Caret,
    #[token("~")] Tilde,
    #[token("!")] Bang,
    #[token("<")] Lt,
    #[token(">")] Gt,

    // Delimiters
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBrack,
    #[token("]")] RBrack,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token(",")] Comma,
    #[token(";")] Semi,
    #[token(":")] Colon,
    #[token(".")] Dot,

    #[regex(r".", priority = 0)] Error,
}

const SEMI_INSERT_TABLE: [bool; 256] = {
    let mut t = [false; 256];
    let after = [
        RawTok::Ident,
        RawTok::Number,
        RawTok::Rune,
        RawTok::String,
        RawTok::RawString,
        RawTok::KwBreak,
        RawTok::KwContinue,
        RawTok::KwFallthrough,
        RawTok::KwReturn,
        RawTok::Inc,
        RawTok::Dec,
        RawTok::RParen,
        RawTok::RBrack,
        RawTok::RBrace,
    ];
    let mut i = 0;
    while i < after.len() {
        t[after[i] as usize] = true;
        i += 1;
    }
    t
};

impl RawTok {
    #[inline(always)]
    const fn can_insert_semicolon(self) -> bool {
        SEMI_INSERT_TABLE[self as usize]
    }

    #[inline]
    fn to_token<'src>(self, slice: &'src str) -> Tok<'src> {
        macro_rules! simple_tok {
            ($($raw:ident),* $(,)?) => {
                match self {
                    Self::Ident => Tok::Ident(slice),
                    Self::Rune => Tok::RuneLit(slice),
                    Self::String => Tok::StringLit(slice),
                    Self::RawString => Tok::RawStringLit(slice),
                    $(Self::$raw => Tok::$raw,)*
                    // Number, trivia and BOM are handled by the wrapper.
                    _ => Tok::Error,
                }
            };
        }

        simple_tok! {
            KwBreak, KwCase, KwChan, KwConst, KwContinue, KwDefault, KwDefer, KwElse,
            KwFallthrough, KwFor, KwFunc, KwGo, KwGoto, KwIf, KwImport, KwInterface,
            KwMap, KwPackage, KwRange, KwReturn, KwSelect, KwStruct, KwSwitch, KwType, KwVar,

            Ellipsis, ShlAssign, ShrAssign, AndNotAssign, AddAssign, SubAssign, MulAssign,
            DivAssign, ModAssign, AndAssign, OrAssign, XorAssign, Shl, Shr, AndNot, LAnd, LOr,
            EqEq, NotEq, Le, Ge, Inc, Dec, Define, Arrow, Assign, Plus, Minus, Star, Slash,
            Percent, Amp, Pipe, Caret, Tilde, Bang, Lt, Gt,

            LParen, RParen, LBrack, RBrack, LBrace, RBrace, Comma, Semi, Colon, Dot, Error,
        }
    }
}

// =============================================================================
// 5. Public Token Definition (zero-copy)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tok<'input> {
    Ident(&'input str),
    IntLit(&'input str),
    FloatLit(&'input str),
    ImagLit(&'input str),
    RuneLit(&'input str),
    StringLit(&'input str),
    RawStringLit(&'input str),

    // Keywords
    KwBreak,
    KwCase,
    KwChan,
    KwConst,
    KwContinue,
    KwDefault,
    KwDefer,
    KwElse,
    KwFallthrough,
    KwFor,
    KwFunc,
    KwGo,
    KwGoto,
    KwIf,
    KwImport,
    KwInterface,
    KwMap,
    KwPackage,
    KwRange,
    KwReturn,
    KwSelect,
    KwStruct,
    KwSwitch,
    KwType,
    KwVar,

    // Operators / Delimiters
    Ellipsis,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    EqEq,
    NotEq,
    Le,
    Ge,
    Inc,
    Dec,
    Define,
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Lt,
    Gt,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,

    Error,
}

impl<'input> std::fmt::Display for Tok<'input> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Ident(s)
            | Tok::IntLit(s)
            | Tok::FloatLit(s)
            | Tok::ImagLit(s)
            | Tok::RuneLit(s)
            | Tok::StringLit(s)
            | Tok::RawStringLit(s) => f.write_str(s),
            Tok::Semi => f.write_str("';'"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Comment recorded while lexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawComment<'src> {
    pub span: Span,
    pub text: &'src str,
    pub block: bool,
    pub trailing: bool,
}

// =============================================================================
// 6. Lexer wrapper: semicolon insertion + imag lookahead + diags + comments
// =============================================================================

pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    pending: Option<(usize, Tok<'src>, usize)>,
    diags: Vec<Diag>,
    comments: Vec<RawComment<'src>>,
    line_has_token: bool,
    last_can_insert_semi: bool,
    src_len: usize,
    eof_done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str) -> Self {
        Self {
            logos: RawTok::lexer(input),
            pending: None,
            diags: Vec::with_capacity(16),
            comments: Vec::new(),
            line_has_token: false,
            last_can_insert_semi: false,
            src_len: input.len(),
            eof_done: false,
        }
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    /// Comments seen so far, in source order.
    pub fn take_comments(&mut self) -> Vec<RawComment<'src>> {
        std::mem::take(&mut self.comments)
    }

    #[inline]
    fn push_lex_diag(&mut self, kind: LexErrorKind, span: Range<usize>) {
        let sp = Span::from_range(span);
        self.diags.push(LexError { kind, span: sp }.diag());
    }

    #[inline]
    fn emit_semi_at(&mut self, pos: usize) {
        self.pending = Some((pos, Tok::Semi, pos));
    }

    #[inline]
    fn handle_trivia(&mut self, raw: RawTok, span: &Range<usize>, slice: &'src str) -> bool {
        match raw {
            RawTok::Newline => {
                self.line_has_token = false;
                if self.last_can_insert_semi {
                    self.last_can_insert_semi = false;
                    self.emit_semi_at(span.start);
                }
                true
            }
            RawTok::LineComment => {
                self.comments.push(RawComment {
                    span: Span::from_range(span.clone()),
                    text: slice,
                    block: false,
                    trailing: self.line_has_token,
                });
                true
            }
            RawTok::BlockComment => {
                self.comments.push(RawComment {
                    span: Span::from_range(span.clone()),
                    text: slice,
                    block: true,
                    trailing: self.line_has_token,
                });
                if self.last_can_insert_semi {
                    if let Some(off) = first_newline_offset(slice) {
                        self.last_can_insert_semi = false;
                        self.emit_semi_at(span.start + off);
                    }
                }
                true
            }
            _ => false,
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = (usize, Tok<'src>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tok) = self.pending.take() {
                return Some(tok);
            }

            if self.eof_done {
                return None;
            }

            match self.logos.next() {
                None => {
                    // a pending ';' is emitted on the next turn
                    self.handle_eof();
                    continue;
                }
                Some(Err(kind)) => return Some(self.handle_lex_error(kind)),
                Some(Ok(raw)) => {
                    if let Some(item) = self.handle_raw_token(raw) {
                        return Some(item);
                    }
                }
            }
        }
    }
}

impl<'src> Lexer<'src> {
    #[inline]
    fn handle_eof(&mut self) {
        self.eof_done = true;

        if self.last_can_insert_semi {
            self.last_can_insert_semi = false;
            self.emit_semi_at(self.src_len);
        }
    }

    #[inline]
    fn handle_lex_error(&mut self, kind: LexErrorKind) -> (usize, Tok<'src>, usize) {
        let span = self.logos.span();
        self.push_lex_diag(kind, span.clone());
        self.last_can_insert_semi = false;
        (span.start, Tok::Error, span.end)
    }

    /// `None` means the raw token was trivia.
    #[inline]
    fn handle_raw_token(&mut self, raw: RawTok) -> Option<(usize, Tok<'src>, usize)> {
        let span = self.logos.span();
        let slice = self.logos.slice();

        if raw == RawTok::Bom {
            if span.start == 0 {
                return None;
            }
            self.push_lex_diag(LexErrorKind::InvalidToken, span.clone());
            self.last_can_insert_semi = false;
            return Some((span.start, Tok::Error, span.end));
        }

        if self.handle_trivia(raw, &span, slice) {
            return None;
        }

        if raw == RawTok::Error {
            self.push_lex_diag(LexErrorKind::InvalidToken, span.clone());
            self.last_can_insert_semi = false;
            return Some((span.start, Tok::Error, span.end));
        }

        self.line_has_token = true;
        if raw == RawTok::Number {
            return Some(self.handle_number_token(span, slice));
        }

        self.last_can_insert_semi = raw.can_insert_semicolon();
        Some((span.start, raw.to_token(slice), span.end))
    }

    fn handle_number_token(
        &mut self,
        span: Range<usize>,
        slice: &'src str,
    ) -> (usize, Tok<'src>, usize) {
        let src = self.logos.source();
        let bytes = slice.as_bytes();

        if src.as_bytes().get(span.end) == Some(&b'i') {
            let end = span.end + 1;
            let valid = num::classify_number(bytes).is_ok() || num::is_decimal_digits(bytes);
            self.logos.bump(1);
            self.last_can_insert_semi = valid;
            if !valid {
                self.push_lex_diag(LexErrorKind::InvalidNumber, span.start..end);
                return (span.start, Tok::Error, end);
            }
            return (span.start, Tok::ImagLit(&src[span.start..end]), end);
        }

        match num::classify_number(bytes) {
            Ok(kind) => {
                self.last_can_insert_semi = true;
                let tok = match kind {
                    NumKind::Float => Tok::FloatLit(slice),
                    NumKind::Int => Tok::IntLit(slice),
                };
                (span.start, tok, span.end)
            }
            Err(kind) => {
                self.push_lex_diag(kind, span.clone());
                self.last_can_insert_semi = false;
                (span.start, Tok::Error, span.end)
            }
        }
    }
}
