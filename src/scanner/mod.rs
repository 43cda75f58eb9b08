use std::fmt;

use crate::error::Error;


#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Var,
    If,
    Elsif,
    Else,
    While,
    Return,
    Name(String),
    /// Numbers, strings, chars, `true`, `false`, `null`; payload is the
    /// exact source spelling.
    Literal(String),
    /// `( ) { } , ;` and the assignment `=`.
    Delim(char),
    /// Operator lexeme classified into precedence tiers 1..=7.
    Op(u32, String),
    And,
    Or,
    Not,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Var => write!(f, "'var'"),
            Token::If => write!(f, "'if'"),
            Token::Elsif => write!(f, "'elsif'"),
            Token::Else => write!(f, "'else'"),
            Token::While => write!(f, "'while'"),
            Token::Return => write!(f, "'return'"),
            Token::Name(name) => write!(f, "'{}'", name),
            Token::Literal(text) => write!(f, "{}", text),
            Token::Delim(d) => write!(f, "'{}'", d),
            Token::Op(_, op) => write!(f, "'{}'", op),
            Token::And => write!(f, "'&&'"),
            Token::Or => write!(f, "'||'"),
            Token::Not => write!(f, "'!'"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// The precedence tier of an operator is decided by its first character;
/// `=`, `&&`, `||` and `!` are not operator names but their own tokens.
fn classify_op(text: &str) -> Token {
    match text {
        "=" => Token::Delim('='),
        "&&" => Token::And,
        "||" => Token::Or,
        "!" => Token::Not,
        _ => {
            let tier = match text.as_bytes()[0] {
                b'?' | b'~' | b'^' => 1,
                b':' => 2,
                b'|' => 3,
                b'&' => 4,
                b'<' | b'>' | b'=' | b'!' => 5,
                b'+' | b'-' => 6,
                _ => 7, // * / %
            };
            Token::Op(tier, text.to_owned())
        }
    }
}

#[derive(Debug, Clone)]
struct PosToken {
    t: Token,
    begin: usize,
    end: usize,
}

peg::parser! { grammar tokenizer() for str {
    pub rule tokenize() -> Vec<PosToken>
        = ts:token()* (ws() / comment())* { ts }

    rule ws()
        = quiet!{[' '|'\t'|'\n'|'\r']+}

    rule comment()
        = quiet!{";;;" [^'\n']*}

    rule token() -> PosToken
        = (ws() / comment())*
          begin:position!() tok:(
            keyword() / literal() / name() / opname() / delim()
          ) end:position!()
          { PosToken { t: tok, begin, end } }

    rule alnum_() = quiet!{['a'..='z'|'A'..='Z'|'0'..='9'|'_']}

    rule keyword() -> Token
        = "var" !alnum_() { Token::Var }
        / "if" !alnum_() { Token::If }
        / "elsif" !alnum_() { Token::Elsif }
        / "else" !alnum_() { Token::Else }
        / "while" !alnum_() { Token::While }
        / "return" !alnum_() { Token::Return }

    rule literal() -> Token
        = lit:$("true" !alnum_() / "false" !alnum_() / "null" !alnum_())
          { Token::Literal(lit.to_owned()) }
        / lit:$(['0'..='9']+ ("." ['0'..='9']+)?)
          { Token::Literal(lit.to_owned()) }
        / lit:$("\"" (("\\" [_]) / [^'"'|'\\'])* "\"")
          { Token::Literal(lit.to_owned()) }
        / lit:$("'" (("\\" [_]) / [^'\''|'\\']) "'")
          { Token::Literal(lit.to_owned()) }

    rule name() -> Token
        = n:quiet!{$(['a'..='z'|'A'..='Z'|'_'] alnum_()*)}
          { Token::Name(n.to_owned()) }
        / expected!("name")

    rule opchar()
        = ['+'|'-'|'*'|'/'|'%'|'<'|'>'|'='|'!'|'&'|'|'|'?'|'~'|'^'|':']

    rule opname() -> Token
        = op:quiet!{$(opchar()+)} { classify_op(op) }
        / expected!("operator")

    rule delim() -> Token
        = "(" { Token::Delim('(') }
        / ")" { Token::Delim(')') }
        / "{" { Token::Delim('{') }
        / "}" { Token::Delim('}') }
        / "," { Token::Delim(',') }
        / ";" { Token::Delim(';') }
} }

fn line_col(text: &str, pos: usize) -> (usize, usize) {
    let before = &text[..pos];
    let line = before.bytes().filter(|&c| c == b'\n').count() + 1;
    let column = before.chars().rev().take_while(|&c| c != '\n').count() + 1;
    (line, column)
}

/// Token source consumed by the parser: current token kind, current lexeme,
/// current position, and `advance`. The whole input is tokenized up front,
/// so a scan failure surfaces here rather than on `advance`.
pub struct Scanner {
    tokens: Vec<Token>,
    lexemes: Vec<String>,
    positions: Vec<(usize, usize)>,
    pos: usize,
}

impl Scanner {
    pub fn new(text: &str) -> Result<Self, Error> {
        let pos_tokens = tokenizer::tokenize(text).map_err(|err| Error::Lexical {
            line: err.location.line,
            column: err.location.column,
        })?;

        let mut tokens = Vec::with_capacity(pos_tokens.len() + 1);
        let mut lexemes = Vec::with_capacity(pos_tokens.len() + 1);
        let mut positions = Vec::with_capacity(pos_tokens.len() + 1);
        for pt in pos_tokens {
            positions.push(line_col(text, pt.begin));
            lexemes.push(text[pt.begin..pt.end].to_owned());
            tokens.push(pt.t);
        }
        positions.push(line_col(text, text.len()));
        lexemes.push("end of input".to_owned());
        tokens.push(Token::Eof);

        Ok(Self {
            tokens,
            lexemes,
            positions,
            pos: 0,
        })
    }

    pub fn token(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub fn lexeme(&self) -> &str {
        &self.lexemes[self.pos]
    }

    pub fn line(&self) -> usize {
        self.positions[self.pos].0
    }

    pub fn column(&self) -> usize {
        self.positions[self.pos].1
    }

    pub fn advance(&mut self) {
        // stays on Eof once it is reached
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }
}
