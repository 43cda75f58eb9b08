use log::debug;

use crate::ast::{Expr, Function, Program};
use crate::error::Error;
use crate::scanner::{Scanner, Token};


/// Parses a whole program off the token source. Fails on the first
/// malformed construct; no recovery, no partial AST.
pub fn parse(scanner: &mut Scanner) -> Result<Program, Error> {
    Parser { scanner }.program()
}

/// The flat parameter+local slot space of one function. Lives for one
/// function parse and is dropped with it.
struct VarEnv {
    names: Vec<String>,
}

impl VarEnv {
    fn new() -> Self {
        Self { names: Vec::new() }
    }

    fn declare(&mut self, name: String) -> Result<usize, Error> {
        if self.names.iter().any(|n| *n == name) {
            return Err(Error::DuplicateVariable { name });
        }
        self.names.push(name);
        Ok(self.names.len() - 1)
    }

    fn lookup(&self, name: &str) -> Result<usize, Error> {
        self.names.iter().position(|n| *n == name).ok_or_else(|| {
            Error::UnresolvedVariable {
                name: name.to_owned(),
            }
        })
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

struct Parser<'a> {
    scanner: &'a mut Scanner,
}

impl Parser<'_> {
    fn syntax_error(&self, expected: Option<String>) -> Error {
        Error::Syntax {
            line: self.scanner.line(),
            column: self.scanner.column(),
            found: self.scanner.lexeme().to_owned(),
            expected,
        }
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.scanner.token() == token {
            self.scanner.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), Error> {
        if self.accept(token) {
            Ok(())
        } else {
            Err(self.syntax_error(Some(token.to_string())))
        }
    }

    fn accept_name(&mut self) -> Option<String> {
        match self.scanner.token() {
            Token::Name(name) => {
                let name = name.clone();
                self.scanner.advance();
                Some(name)
            }
            _ => None,
        }
    }

    fn expect_name(&mut self) -> Result<String, Error> {
        self.accept_name()
            .ok_or_else(|| self.syntax_error(Some("a name".to_owned())))
    }

    fn accept_op(&mut self, tier: u32) -> Option<String> {
        match self.scanner.token() {
            Token::Op(t, op) if *t == tier => {
                let op = op.clone();
                self.scanner.advance();
                Some(op)
            }
            _ => None,
        }
    }

    fn accept_any_op(&mut self) -> Option<String> {
        match self.scanner.token() {
            Token::Op(_, op) => {
                let op = op.clone();
                self.scanner.advance();
                Some(op)
            }
            _ => None,
        }
    }

    // program = { function } EOF
    fn program(&mut self) -> Result<Program, Error> {
        let mut functions = Vec::new();
        while self.scanner.token() != &Token::Eof {
            functions.push(self.function()?);
        }
        Ok(Program { functions })
    }

    // function = NAME '(' [ NAME { ',' NAME } ] ')'
    //            '{' { decl ';' } { expr ';' } '}'
    fn function(&mut self) -> Result<Function, Error> {
        let name = self.expect_name()?;
        let mut env = VarEnv::new();

        self.expect(&Token::Delim('('))?;
        if let Some(param) = self.accept_name() {
            env.declare(param)?;
            while self.accept(&Token::Delim(',')) {
                let param = self.expect_name()?;
                env.declare(param)?;
            }
        }
        self.expect(&Token::Delim(')'))?;
        let arity = env.len();

        self.expect(&Token::Delim('{'))?;
        while self.scanner.token() == &Token::Var {
            self.decl(&mut env)?;
            self.expect(&Token::Delim(';'))?;
        }
        let locals = env.len() - arity;

        let mut body = Vec::new();
        while !self.accept(&Token::Delim('}')) {
            body.push(self.expr(&env)?);
            self.expect(&Token::Delim(';'))?;
        }

        debug!("parsed {} arity={} locals={}", name, arity, locals);
        Ok(Function {
            name,
            arity,
            locals,
            body,
        })
    }

    // decl = 'var' NAME { ',' NAME }
    fn decl(&mut self, env: &mut VarEnv) -> Result<(), Error> {
        self.expect(&Token::Var)?;
        let name = self.expect_name()?;
        env.declare(name)?;
        while self.accept(&Token::Delim(',')) {
            let name = self.expect_name()?;
            env.declare(name)?;
        }
        Ok(())
    }

    // expr = 'return' expr | orexpr
    fn expr(&mut self, env: &VarEnv) -> Result<Expr, Error> {
        if self.accept(&Token::Return) {
            let value = self.expr(env)?;
            return Ok(Expr::Return(Box::new(value)));
        }
        self.orexpr(env)
    }

    // orexpr = andexpr [ '||' orexpr ]
    fn orexpr(&mut self, env: &VarEnv) -> Result<Expr, Error> {
        let left = self.andexpr(env)?;
        if self.accept(&Token::Or) {
            let right = self.orexpr(env)?;
            return Ok(Expr::Or(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    // andexpr = notexpr [ '&&' andexpr ]
    fn andexpr(&mut self, env: &VarEnv) -> Result<Expr, Error> {
        let left = self.notexpr(env)?;
        if self.accept(&Token::And) {
            let right = self.andexpr(env)?;
            return Ok(Expr::And(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    // notexpr = '!' notexpr | binopexpr1
    fn notexpr(&mut self, env: &VarEnv) -> Result<Expr, Error> {
        if self.accept(&Token::Not) {
            let operand = self.notexpr(env)?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.binopexpr(env, 1)
    }

    // binopexprN = binopexprN+1 { OPNAMEN binopexprN+1 }
    // except tier 2 (infix cons), which is right-associative, and tier 7,
    // whose operands are smallexpr
    fn binopexpr(&mut self, env: &VarEnv, tier: u32) -> Result<Expr, Error> {
        if tier > 7 {
            return self.smallexpr(env);
        }
        if tier == 2 {
            let left = self.binopexpr(env, 3)?;
            if let Some(op) = self.accept_op(2) {
                let right = self.binopexpr(env, 2)?;
                return Ok(Expr::Call {
                    name: op,
                    args: vec![left, right],
                });
            }
            return Ok(left);
        }
        let mut expr = self.binopexpr(env, tier + 1)?;
        while let Some(op) = self.accept_op(tier) {
            let right = self.binopexpr(env, tier + 1)?;
            expr = Expr::Call {
                name: op,
                args: vec![expr, right],
            };
        }
        Ok(expr)
    }

    // smallexpr = NAME [ '(' [ expr { ',' expr } ] ')' | '=' expr ]
    //           | opname smallexpr | LITERAL | '(' expr ')'
    //           | ifexpr | 'while' '(' expr ')' body
    fn smallexpr(&mut self, env: &VarEnv) -> Result<Expr, Error> {
        if let Some(name) = self.accept_name() {
            if self.accept(&Token::Delim('(')) {
                let args = self.call_args(env)?;
                return Ok(Expr::Call { name, args });
            }
            if self.accept(&Token::Delim('=')) {
                let slot = env.lookup(&name)?;
                let value = self.expr(env)?;
                return Ok(Expr::Store(slot, Box::new(value)));
            }
            return Ok(Expr::Fetch(env.lookup(&name)?));
        }

        if let Some(op) = self.accept_any_op() {
            let operand = self.smallexpr(env)?;
            return Ok(Expr::Call {
                name: op,
                args: vec![operand],
            });
        }

        match self.scanner.token() {
            Token::Literal(text) => {
                let text = text.clone();
                self.scanner.advance();
                Ok(Expr::Literal(text))
            }
            Token::Delim('(') => {
                self.scanner.advance();
                let inner = self.expr(env)?;
                self.expect(&Token::Delim(')'))?;
                Ok(inner)
            }
            Token::If => self.ifexpr(env),
            Token::While => {
                self.scanner.advance();
                self.expect(&Token::Delim('('))?;
                let cond = self.expr(env)?;
                self.expect(&Token::Delim(')'))?;
                let body = self.body(env)?;
                Ok(Expr::While {
                    cond: Box::new(cond),
                    body: Box::new(body),
                })
            }
            _ => Err(self.syntax_error(Some("an expression".to_owned()))),
        }
    }

    // the arguments after the opening '(' of a call
    fn call_args(&mut self, env: &VarEnv) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        if !self.accept(&Token::Delim(')')) {
            args.push(self.expr(env)?);
            while self.accept(&Token::Delim(',')) {
                args.push(self.expr(env)?);
            }
            self.expect(&Token::Delim(')'))?;
        }
        Ok(args)
    }

    // ifexpr = 'if' '(' expr ')' body
    //          { 'elsif' '(' expr ')' body } [ 'else' body ]
    fn ifexpr(&mut self, env: &VarEnv) -> Result<Expr, Error> {
        self.expect(&Token::If)?;
        self.expect(&Token::Delim('('))?;
        let cond = self.expr(env)?;
        self.expect(&Token::Delim(')'))?;
        let then_expr = self.body(env)?;

        let mut elsifs = Vec::new();
        while self.accept(&Token::Elsif) {
            self.expect(&Token::Delim('('))?;
            let cond = self.expr(env)?;
            self.expect(&Token::Delim(')'))?;
            let body = self.body(env)?;
            elsifs.push((cond, body));
        }

        let mut else_expr = if self.accept(&Token::Else) {
            Some(Box::new(self.body(env)?))
        } else {
            None
        };

        // each elsif becomes the else branch of the condition before it
        for (cond, body) in elsifs.into_iter().rev() {
            else_expr = Some(Box::new(Expr::If {
                cond: Box::new(cond),
                then_expr: Box::new(body),
                else_expr,
            }));
        }

        Ok(Expr::If {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr,
        })
    }

    // body = '{' { expr ';' } '}'
    fn body(&mut self, env: &VarEnv) -> Result<Expr, Error> {
        self.expect(&Token::Delim('{'))?;
        let mut exprs = Vec::new();
        while !self.accept(&Token::Delim('}')) {
            exprs.push(self.expr(env)?);
            self.expect(&Token::Delim(';'))?;
        }
        Ok(Expr::Body(exprs))
    }
}
