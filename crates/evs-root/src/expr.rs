//! Selection expressions over tree branches.
//!
//! Pre-selections are TTreeFormula-like strings such as
//! `njet >= 2 && abs(eta) < 2.4`. A row passes when the expression
//! evaluates to a positive value. Supported: numbers, branch names,
//! `+ - * /`, comparisons, `&& || !`, parentheses and the functions
//! `abs sqrt log exp pow min max`.

use crate::error::{Result, RootError};

/// A compiled selection expression.
#[derive(Debug, Clone)]
pub struct SelectionExpr {
    source: String,
    root: Node,
    branches: Vec<String>,
}

impl SelectionExpr {
    /// Parse `input`. Branch names are collected in order of first use.
    pub fn compile(input: &str) -> Result<Self> {
        let tokens = lex(input)?;
        let mut parser = Parser { tokens: &tokens, pos: 0, branches: Vec::new() };
        let root = parser.expr(0)?;
        if let Some(tok) = parser.tokens.get(parser.pos) {
            return Err(RootError::Expression(format!(
                "unexpected {:?} after expression in '{}'",
                tok, input
            )));
        }
        Ok(SelectionExpr { source: input.to_string(), root, branches: parser.branches })
    }

    /// The expression text as given.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Branches the expression reads, in the order `eval_row` expects values.
    pub fn required_branches(&self) -> &[String] {
        &self.branches
    }

    /// Evaluate for one row.
    pub fn eval_row(&self, values: &[f64]) -> f64 {
        self.root.eval(values)
    }

    /// Indices of the rows that pass, given one column per required branch.
    ///
    /// Every column must hold `n_rows` values.
    pub fn select_rows(&self, columns: &[Vec<f64>], n_rows: usize) -> Result<Vec<usize>> {
        if columns.len() != self.branches.len() {
            return Err(RootError::Expression(format!(
                "'{}' needs {} columns, got {}",
                self.source,
                self.branches.len(),
                columns.len()
            )));
        }
        if let Some((i, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != n_rows) {
            return Err(RootError::Expression(format!(
                "column '{}' has {} rows, expected {}",
                self.branches[i],
                col.len(),
                n_rows
            )));
        }

        let mut row = vec![0.0; columns.len()];
        Ok((0..n_rows)
            .filter(|&i| {
                for (slot, col) in row.iter_mut().zip(columns) {
                    *slot = col[i];
                }
                self.root.eval(&row) > 0.0
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    Branch(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(Op, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Op {
    /// Left binding power; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge => 3,
            Op::Add | Op::Sub => 4,
            Op::Mul | Op::Div => 5,
        }
    }

    fn apply(self, l: f64, r: f64) -> f64 {
        match self {
            Op::Add => l + r,
            Op::Sub => l - r,
            Op::Mul => l * r,
            Op::Div => l / r,
            Op::Eq => truth(l == r),
            Op::Ne => truth(l != r),
            Op::Lt => truth(l < r),
            Op::Le => truth(l <= r),
            Op::Gt => truth(l > r),
            Op::Ge => truth(l >= r),
            Op::And => truth(l > 0.0 && r > 0.0),
            Op::Or => truth(l > 0.0 || r > 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<(Func, usize)> {
        let f = match name {
            "abs" | "fabs" | "TMath::Abs" => (Func::Abs, 1),
            "sqrt" | "TMath::Sqrt" => (Func::Sqrt, 1),
            "log" | "TMath::Log" => (Func::Log, 1),
            "exp" | "TMath::Exp" => (Func::Exp, 1),
            "pow" | "TMath::Power" => (Func::Pow, 2),
            "min" | "TMath::Min" => (Func::Min, 2),
            "max" | "TMath::Max" => (Func::Max, 2),
            _ => return None,
        };
        Some(f)
    }
}

fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Node {
    fn eval(&self, values: &[f64]) -> f64 {
        match self {
            Node::Const(v) => *v,
            Node::Branch(i) => values[*i],
            Node::Neg(a) => -a.eval(values),
            Node::Not(a) => truth(a.eval(values) <= 0.0),
            // && and || short-circuit the right-hand side.
            Node::Binary(Op::And, l, r) => truth(l.eval(values) > 0.0 && r.eval(values) > 0.0),
            Node::Binary(Op::Or, l, r) => truth(l.eval(values) > 0.0 || r.eval(values) > 0.0),
            Node::Binary(op, l, r) => op.apply(l.eval(values), r.eval(values)),
            Node::Call(func, args) => {
                let x = args[0].eval(values);
                match func {
                    Func::Abs => x.abs(),
                    Func::Sqrt => x.sqrt(),
                    Func::Log => x.ln(),
                    Func::Exp => x.exp(),
                    Func::Pow => x.powf(args[1].eval(values)),
                    Func::Min => x.min(args[1].eval(values)),
                    Func::Max => x.max(args[1].eval(values)),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Name(String),
    Op(Op),
    Not,
    LParen,
    RParen,
    Comma,
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let two = bytes.get(i..i + 2);
        let paired = match two {
            Some(b"&&") => Some(Token::Op(Op::And)),
            Some(b"||") => Some(Token::Op(Op::Or)),
            Some(b"==") => Some(Token::Op(Op::Eq)),
            Some(b"!=") => Some(Token::Op(Op::Ne)),
            Some(b"<=") => Some(Token::Op(Op::Le)),
            Some(b">=") => Some(Token::Op(Op::Ge)),
            _ => None,
        };
        if let Some(tok) = paired {
            tokens.push(tok);
            i += 2;
            continue;
        }

        let single = match c {
            b'+' => Some(Token::Op(Op::Add)),
            b'-' => Some(Token::Op(Op::Sub)),
            b'*' => Some(Token::Op(Op::Mul)),
            b'/' => Some(Token::Op(Op::Div)),
            b'<' => Some(Token::Op(Op::Lt)),
            b'>' => Some(Token::Op(Op::Gt)),
            b'!' => Some(Token::Not),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(tok) = single {
            tokens.push(tok);
            i += 1;
            continue;
        }

        let start = i;
        if c.is_ascii_digit() || c == b'.' {
            while i < bytes.len() {
                let d = bytes[i];
                let exp_sign = (d == b'+' || d == b'-') && matches!(bytes[i - 1], b'e' | b'E');
                if !(d.is_ascii_digit() || d == b'.' || d == b'e' || d == b'E' || exp_sign) {
                    break;
                }
                i += 1;
            }
            let text = &input[start..i];
            let v = text
                .parse()
                .map_err(|_| RootError::Expression(format!("invalid number '{}'", text)))?;
            tokens.push(Token::Num(v));
        } else if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric()
                    || bytes[i] == b'_'
                    || bytes[i] == b'.'
                    || bytes[i..].starts_with(b"::"))
            {
                i += if bytes[i] == b':' { 2 } else { 1 };
            }
            tokens.push(Token::Name(input[start..i].to_string()));
        } else {
            return Err(RootError::Expression(format!(
                "unexpected character '{}' at {}",
                c as char, i
            )));
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    branches: Vec<String>,
}

impl Parser<'_> {
    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += usize::from(tok.is_some());
        tok
    }

    fn eat(&mut self, expected: &Token) -> Result<()> {
        match self.next() {
            Some(ref t) if t == expected => Ok(()),
            other => Err(RootError::Expression(format!("expected {:?}, got {:?}", expected, other))),
        }
    }

    /// Precedence climbing: parse operators binding tighter than `min_prec`.
    fn expr(&mut self, min_prec: u8) -> Result<Node> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op)) = self.tokens.get(self.pos) {
            let op = *op;
            let prec = op.precedence();
            if prec <= min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(prec)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(Op::Sub)) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.unary()?)))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Node::Const(v)),
            Some(Token::LParen) => {
                let inner = self.expr(0)?;
                self.eat(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.tokens.get(self.pos) == Some(&Token::LParen) => {
                self.pos += 1;
                self.call(&name)
            }
            Some(Token::Name(name)) => {
                let idx = match self.branches.iter().position(|b| *b == name) {
                    Some(i) => i,
                    None => {
                        self.branches.push(name);
                        self.branches.len() - 1
                    }
                };
                Ok(Node::Branch(idx))
            }
            other => Err(RootError::Expression(format!(
                "expected a number, name or '(', got {:?}",
                other
            ))),
        }
    }

    fn call(&mut self, name: &str) -> Result<Node> {
        let (func, arity) = Func::lookup(name)
            .ok_or_else(|| RootError::Expression(format!("unknown function '{}'", name)))?;
        let mut args = vec![self.expr(0)?];
        while self.tokens.get(self.pos) == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.expr(0)?);
        }
        self.eat(&Token::RParen)?;
        if args.len() != arity {
            return Err(RootError::Expression(format!(
                "{} takes {} argument(s), got {}",
                name,
                arity,
                args.len()
            )));
        }
        Ok(Node::Call(func, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, values: &[f64]) -> f64 {
        SelectionExpr::compile(src).unwrap().eval_row(values)
    }

    #[test]
    fn precedence_and_constants() {
        assert_eq!(eval("2 + 3 * 4", &[]), 14.0);
        assert_eq!(eval("(1 + 2) * (3 + 4)", &[]), 21.0);
        assert_eq!(eval("10 - 4 - 3", &[]), 3.0);
        assert_eq!(eval("-x + 1", &[5.0]), -4.0);
        assert!((eval("1.5e2 + 3.0E-1", &[]) - 150.3).abs() < 1e-10);
    }

    #[test]
    fn branches_in_first_use_order() {
        let e = SelectionExpr::compile("pt > 20 && abs(eta) < 2.4 && pt < 200").unwrap();
        assert_eq!(e.required_branches(), ["pt", "eta"]);
        assert_eq!(e.eval_row(&[25.0, -1.0]), 1.0);
        assert_eq!(e.eval_row(&[25.0, 3.0]), 0.0);
        assert_eq!(e.source(), "pt > 20 && abs(eta) < 2.4 && pt < 200");
    }

    #[test]
    fn boolean_operators() {
        assert_eq!(eval("x > 5 || y < 2", &[6.0, 3.0]), 1.0);
        assert_eq!(eval("x > 5 || y < 2", &[3.0, 3.0]), 0.0);
        assert_eq!(eval("!(x > 3)", &[2.0]), 1.0);
        assert_eq!(eval("x != 1", &[1.0]), 0.0);
        assert_eq!(eval("a == 1 && b >= 2 || c", &[0.0, 0.0, 1.0]), 1.0);
    }

    #[test]
    fn functions_check_arity() {
        assert_eq!(eval("pow(x, 2)", &[3.0]), 9.0);
        assert_eq!(eval("TMath::Max(a, b)", &[3.0, 7.0]), 7.0);
        assert!(SelectionExpr::compile("sqrt(1, 2)").is_err());
        assert!(SelectionExpr::compile("cosh(1)").is_err());
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "1 +", "(a > 1", "a > 1)", "a $ b", "1.2.3"] {
            assert!(
                matches!(SelectionExpr::compile(bad), Err(RootError::Expression(_))),
                "{:?} should not compile",
                bad
            );
        }
    }

    #[test]
    fn select_rows_keeps_positive_results() {
        let e = SelectionExpr::compile("njet >= 2 && ht > 100").unwrap();
        let columns = vec![vec![1.0, 2.0, 3.0, 2.0], vec![500.0, 150.0, 50.0, 101.0]];
        assert_eq!(e.select_rows(&columns, 4).unwrap(), vec![1, 3]);
        assert!(e.select_rows(&columns[..1], 4).is_err());
        assert!(e.select_rows(&columns, 5).is_err());
    }
}
