use std::fmt::{self, Write};

use log::debug;

use crate::ast::{Expr, Function, Program};
use crate::error::Error;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Label(usize);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.0)
    }
}

macro_rules! emit {
    ($gen:expr, $($arg:tt)*) => {
        $gen.line(format_args!($($arg)*))
    };
}

/// One code-generation session. The label counter is owned by the session
/// and never reset, so labels are unique across the whole program.
pub struct CodeGen {
    labels: usize,
    out: String,
}

impl CodeGen {
    pub fn new() -> Self {
        Self {
            labels: 0,
            out: String::new(),
        }
    }

    fn new_label(&mut self) -> Label {
        self.labels += 1;
        Label(self.labels)
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        // writing into a String cannot fail
        let _ = self.out.write_fmt(args);
        self.out.push('\n');
    }

    pub fn program(mut self, name: &str, program: &Program) -> Result<String, Error> {
        emit!(self, "\"{}.mexe\" = main in", name);
        emit!(self, "!{{{{");
        for function in &program.functions {
            self.function(function)?;
        }
        emit!(self, "}}}}*BASIS;");
        Ok(self.out)
    }

    fn function(&mut self, f: &Function) -> Result<(), Error> {
        debug!("generating {} arity={} locals={}", f.name, f.arity, f.locals);
        emit!(self, "#\"{}[f{}]\" =", f.name, f.arity);
        emit!(self, "[");
        if f.locals > 0 {
            emit!(self, "(MakeVal null)");
            for _ in 0..f.locals {
                emit!(self, "(Push)");
            }
        }
        for expr in &f.body {
            self.value(expr)?;
        }
        // safety net for functions that fall off the end
        emit!(self, "(Return)");
        emit!(self, "];");
        Ok(())
    }

    /// Value context: when control reaches the next instruction the result
    /// sits in the accumulator.
    fn value(&mut self, expr: &Expr) -> Result<(), Error> {
        match expr {
            Expr::Fetch(slot) => emit!(self, "(Fetch {})", slot),
            Expr::Store(slot, value) => {
                self.value(value)?;
                emit!(self, "(Store {})", slot);
            }
            Expr::Literal(text) => emit!(self, "(MakeVal {})", text),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                let lab_else = self.new_label();
                let lab_end = self.new_label();
                self.jump(cond, None, Some(lab_else))?;
                self.value(then_expr)?;
                emit!(self, "(Go {})", lab_end);
                emit!(self, "{}:", lab_else);
                if let Some(else_expr) = else_expr {
                    self.value(else_expr)?;
                }
                emit!(self, "{}:", lab_end);
            }
            Expr::While { cond, body } => {
                let lab_loop = self.new_label();
                let lab_end = self.new_label();
                emit!(self, "{}:", lab_loop);
                self.jump(cond, None, Some(lab_end))?;
                self.value(body)?;
                emit!(self, "(Go {})", lab_loop);
                emit!(self, "{}:", lab_end);
            }
            Expr::Body(exprs) => {
                for expr in exprs {
                    self.value(expr)?;
                }
            }
            Expr::Call { name, args } => {
                self.args(args)?;
                emit!(self, "(Call #\"{}[f{}]\" {})", name, args.len(), args.len());
            }
            Expr::Return(value) => self.tail(value)?,
            Expr::And(left, right) => {
                let lab = self.new_label();
                self.value(left)?;
                emit!(self, "(GoFalse {})", lab);
                self.value(right)?;
                emit!(self, "{}:", lab);
            }
            Expr::Or(left, right) => {
                let lab = self.new_label();
                self.value(left)?;
                emit!(self, "(GoTrue {})", lab);
                self.value(right)?;
                emit!(self, "{}:", lab);
            }
            Expr::Not(operand) => {
                self.value(operand)?;
                emit!(self, "(Not)");
            }
        }
        Ok(())
    }

    /// Push context: the value additionally lands on the argument stack.
    /// The P leaves fuse a push of the previous accumulator with the
    /// operation; node kinds without a P form spell the push out instead.
    fn push(&mut self, expr: &Expr) -> Result<(), Error> {
        match expr {
            Expr::Fetch(slot) => emit!(self, "(FetchP {})", slot),
            Expr::Store(slot, value) => {
                self.value(value)?;
                emit!(self, "(StoreP {})", slot);
            }
            Expr::Literal(text) => emit!(self, "(MakeValP {})", text),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                let lab_else = self.new_label();
                let lab_end = self.new_label();
                self.jump(cond, None, Some(lab_else))?;
                self.push(then_expr)?;
                emit!(self, "(Go {})", lab_end);
                emit!(self, "{}:", lab_else);
                if let Some(else_expr) = else_expr {
                    self.push(else_expr)?;
                }
                emit!(self, "{}:", lab_end);
            }
            Expr::Call { name, args } => {
                // every argument is pushed here; the first P leaf saves the
                // previous accumulator
                for arg in args {
                    self.push(arg)?;
                }
                if args.is_empty() {
                    emit!(self, "(Push)");
                }
                emit!(self, "(Call #\"{}[f{}]\" {})", name, args.len(), args.len());
            }
            Expr::Return(value) => self.tail(value)?,
            _ => {
                emit!(self, "(Push)");
                self.value(expr)?;
            }
        }
        Ok(())
    }

    /// Return context: prefer the fused *R forms when the outermost shape
    /// permits; everything else computes the value and returns explicitly.
    fn tail(&mut self, expr: &Expr) -> Result<(), Error> {
        match expr {
            Expr::Fetch(slot) => emit!(self, "(FetchR {})", slot),
            Expr::Store(slot, value) => {
                self.value(value)?;
                emit!(self, "(StoreR {})", slot);
            }
            Expr::Literal(text) => emit!(self, "(MakeValR {})", text),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                // both arms must return; a tail if without an else branch
                // would fall through with no value
                let else_expr = else_expr.as_ref().ok_or(Error::MissingElse)?;
                let lab_else = self.new_label();
                self.jump(cond, None, Some(lab_else))?;
                self.tail(then_expr)?;
                emit!(self, "{}:", lab_else);
                self.tail(else_expr)?;
            }
            Expr::Call { name, args } => {
                self.args(args)?;
                emit!(self, "(CallR #\"{}[f{}]\" {})", name, args.len(), args.len());
            }
            Expr::Return(value) => self.tail(value)?,
            _ => {
                self.value(expr)?;
                emit!(self, "(Return)");
            }
        }
        Ok(())
    }

    /// Jump-compilation: either target may be fallthrough (`None`). Literal
    /// conditions fold at compile time, `false` and `null` being the only
    /// falsy spellings; no runtime test is emitted for them.
    fn jump(
        &mut self,
        cond: &Expr,
        on_true: Option<Label>,
        on_false: Option<Label>,
    ) -> Result<(), Error> {
        match cond {
            Expr::Literal(text) => {
                if text == "false" || text == "null" {
                    if let Some(lab) = on_false {
                        emit!(self, "(Go {})", lab);
                    }
                } else if let Some(lab) = on_true {
                    emit!(self, "(Go {})", lab);
                }
            }
            _ => {
                self.value(cond)?;
                if let Some(lab) = on_true {
                    emit!(self, "(GoTrue {})", lab);
                }
                if let Some(lab) = on_false {
                    emit!(self, "(GoFalse {})", lab);
                }
            }
        }
        Ok(())
    }

    /// Call argument protocol for value and return contexts: the first
    /// argument stays in the accumulator, the rest are pushed. A
    /// zero-argument call still pushes a placeholder so the call's arity
    /// bookkeeping holds.
    fn args(&mut self, args: &[Expr]) -> Result<(), Error> {
        match args.split_first() {
            Some((first, rest)) => {
                self.value(first)?;
                for arg in rest {
                    self.push(arg)?;
                }
            }
            None => emit!(self, "(Push)"),
        }
        Ok(())
    }
}
