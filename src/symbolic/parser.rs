//! Recursive-descent parser.
//!
//! ```text
//! expr   := term (('+'|'-') term)*
//! term   := factor (('*'|'/') factor)*
//! factor := atom ('^' factor)?
//! atom   := number | identifier | '-' atom | fn '(' expr ')' | '(' expr ')'
//! ```
//!
//! `**` is accepted as a synonym for `^`, an atom may carry a leading `+`,
//! and `pi` names the constant unless it is declared as a variable.
//!
//! Nesting is limited to [`MAX_DEPTH`] levels. Parentheses, unary signs,
//! function calls, exponents and every link of a `+`/`*` chain each count
//! as one level, so the depth of any parsed tree stays bounded.

use super::{Expr, SymbolicError, UnaryFn};

/// Deepest nesting accepted by [`parse`].
pub const MAX_DEPTH: usize = 256;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    End,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(v) => format!("number {v}"),
            Token::Ident(name) => format!("'{name}'"),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Caret => "'^'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::End => "end of input".into(),
        }
    }
}

fn parse_error(position: usize, message: impl Into<String>) -> SymbolicError {
    SymbolicError::Parse {
        position,
        message: message.into(),
    }
}

/// Split the source into tokens tagged with their character offset.
fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, SymbolicError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || c == '.' {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| parse_error(start, format!("invalid number '{text}'")))?;
            if !value.is_finite() {
                return Err(parse_error(start, format!("number '{text}' is out of range")));
            }
            tokens.push((start, Token::Number(value)));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push((start, Token::Ident(chars[start..i].iter().collect())));
            continue;
        }
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Caret
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => return Err(parse_error(start, format!("unexpected character '{other}'"))),
        };
        i += 1;
        tokens.push((start, token));
    }
    tokens.push((chars.len(), Token::End));
    Ok(tokens)
}

struct Parser<'a, S: AsRef<str>> {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    depth: usize,
    variables: &'a [S],
}

impl<'a, S: AsRef<str>> Parser<'a, S> {
    fn peek(&self) -> &Token {
        &self.tokens[self.cursor].1
    }

    fn position(&self) -> usize {
        self.tokens[self.cursor].0
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.cursor].1.clone();
        if token != Token::End {
            self.cursor += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), SymbolicError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(parse_error(
                self.position(),
                format!(
                    "expected {} but found {}",
                    expected.describe(),
                    self.peek().describe()
                ),
            ))
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.as_ref() == name)
    }

    fn deepen(&mut self) -> Result<(), SymbolicError> {
        if self.depth >= MAX_DEPTH {
            return Err(parse_error(
                self.position(),
                format!("expression is nested more than {MAX_DEPTH} levels deep"),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, SymbolicError> {
        let outer = self.depth;
        let mut lhs = self.term()?;
        while matches!(self.peek(), Token::Plus | Token::Minus) {
            let op = self.advance();
            self.deepen()?;
            let rhs = self.term()?;
            lhs = if op == Token::Plus { lhs + rhs } else { lhs - rhs };
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, SymbolicError> {
        let outer = self.depth;
        let mut lhs = self.factor()?;
        while matches!(self.peek(), Token::Star | Token::Slash) {
            let op = self.advance();
            self.deepen()?;
            let rhs = self.factor()?;
            lhs = if op == Token::Star { lhs * rhs } else { lhs / rhs };
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, SymbolicError> {
        let base = self.atom()?;
        if *self.peek() == Token::Caret {
            self.advance();
            self.deepen()?;
            let exponent = self.factor();
            self.depth -= 1;
            Ok(base.pow(exponent?))
        } else {
            Ok(base)
        }
    }

    fn atom(&mut self) -> Result<Expr, SymbolicError> {
        self.deepen()?;
        let atom = self.primary();
        self.depth -= 1;
        atom
    }

    fn primary(&mut self) -> Result<Expr, SymbolicError> {
        let position = self.position();
        match self.advance() {
            Token::Number(v) => Ok(Expr::constant(v)),
            Token::Minus => Ok(-self.atom()?),
            Token::Plus => self.atom(),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if *self.peek() == Token::LParen {
                    let func = UnaryFn::from_name(&name).ok_or_else(|| {
                        parse_error(position, format!("unknown function '{name}'"))
                    })?;
                    self.advance();
                    let arg = self.expr()?;
                    self.expect(Token::RParen)?;
                    return Ok(Expr::apply(func, arg));
                }
                if self.is_declared(&name) {
                    Ok(Expr::Var(name))
                } else if name == "pi" {
                    Ok(Expr::constant(std::f64::consts::PI))
                } else if UnaryFn::from_name(&name).is_some() {
                    Err(parse_error(
                        position,
                        format!("function '{name}' must be followed by '('"),
                    ))
                } else {
                    Err(SymbolicError::UnknownVariable { name })
                }
            }
            other => Err(parse_error(
                position,
                format!(
                    "expected a number, variable, function or '(' but found {}",
                    other.describe()
                ),
            )),
        }
    }
}

/// Parse `source` into an expression over the declared `variables`.
///
/// # Examples
/// ```
/// use geometric_control::symbolic::{parse, SymbolicError};
///
/// let e = parse("-sin(x1) + x2**2", &["x1", "x2"]).unwrap();
/// assert_eq!(e.to_string(), "-sin(x1) + x2^2");
///
/// assert_eq!(
///     parse("x3 + 1", &["x1", "x2"]),
///     Err(SymbolicError::UnknownVariable { name: "x3".into() })
/// );
/// ```
pub fn parse<S: AsRef<str>>(source: &str, variables: &[S]) -> Result<Expr, SymbolicError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        cursor: 0,
        depth: 0,
        variables,
    };
    let expr = parser.expr()?;
    if *parser.peek() != Token::End {
        return Err(parse_error(
            parser.position(),
            format!("unexpected {}", parser.peek().describe()),
        ));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 2] = ["x", "y"];

    fn x() -> Expr {
        Expr::var("x")
    }

    fn y() -> Expr {
        Expr::var("y")
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(parse("x + y * x", &VARS).unwrap(), x() + y() * x());
        assert_eq!(parse("x - y - x", &VARS).unwrap(), (x() - y()) - x());
        assert_eq!(parse("x / y / x", &VARS).unwrap(), (x() / y()) / x());
        assert_eq!(
            parse("x ^ y ^ 2", &VARS).unwrap(),
            x().pow(y().pow(Expr::constant(2.0)))
        );
        assert_eq!(parse("(x + y) * x", &VARS).unwrap(), (x() + y()) * x());
    }

    #[test]
    fn test_unary_minus_binds_to_the_atom() {
        assert_eq!(parse("-x^2", &VARS).unwrap(), (-x()).pow(Expr::constant(2.0)));
        assert_eq!(parse("x * -y", &VARS).unwrap(), x() * -y());
        assert_eq!(parse("--x", &VARS).unwrap(), -(-x()));
    }

    #[test]
    fn test_functions_and_numbers() {
        assert_eq!(
            parse("exp(2.5e-1 * x)", &VARS).unwrap(),
            Expr::apply(UnaryFn::Exp, Expr::constant(0.25) * x())
        );
        assert_eq!(
            parse("sqrt(.5)", &VARS).unwrap(),
            Expr::apply(UnaryFn::Sqrt, Expr::constant(0.5))
        );
        assert_eq!(parse("2*pi", &VARS).unwrap(), Expr::constant(2.0) * Expr::constant(std::f64::consts::PI));
        assert_eq!(parse("x**2", &VARS).unwrap(), x().pow(Expr::constant(2.0)));
        assert_eq!(parse("+x", &VARS).unwrap(), x());
    }

    #[test]
    fn test_declared_pi_is_a_variable() {
        assert_eq!(parse("pi", &["pi"]).unwrap(), Expr::var("pi"));
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            parse("x + z", &VARS),
            Err(SymbolicError::UnknownVariable { name: "z".into() })
        );
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("", 0),
            ("x +", 3),
            ("(x + y", 6),
            ("x + y)", 5),
            ("cosh(x)", 0),
            ("sin x", 0),
            ("x $ y", 2),
            ("1.2.3", 0),
        ];
        for (source, position) in cases {
            match parse(source, &VARS) {
                Err(SymbolicError::Parse { position: p, .. }) => {
                    assert_eq!(p, position, "wrong position for {source:?}")
                }
                other => panic!("expected a parse error for {source:?}, got {other:?}"),
            }
        }
    }

    fn assert_parse_error(source: &str) {
        assert!(
            matches!(parse(source, &VARS), Err(SymbolicError::Parse { .. })),
            "expected a parse error"
        );
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let deep = 100_000;
        assert_parse_error(&format!("{}x{}", "(".repeat(deep), ")".repeat(deep)));
        assert_parse_error(&format!("{}x", "-".repeat(deep)));
        assert_parse_error(&format!("{}x{}", "sin(".repeat(deep), ")".repeat(deep)));
        assert_parse_error(&vec!["x"; deep].join("^"));
        assert_parse_error(&vec!["x"; deep].join(" + "));
        assert_parse_error(&vec!["y"; deep].join(" * "));
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let nested = format!("{}x{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&nested, &VARS).unwrap(), x());
        let sum = vec!["x"; 100].join(" + ");
        assert!(parse(&sum, &VARS).is_ok());
    }

    #[test]
    fn test_out_of_range_literal() {
        match parse("2 * 1e400", &VARS) {
            Err(SymbolicError::Parse { position, .. }) => assert_eq!(position, 4),
            other => panic!("expected a parse error, got {other:?}"),
        }
        assert_parse_error("1e999 * x");
    }

    #[test]
    fn test_display_round_trip() {
        let sources = [
            "x + y * x",
            "x - (y - x)",
            "(-x)^2",
            "-(x^2)",
            "x / (y * x)",
            "sin(x)^2 + cos(y) / -2",
            "x^y^2",
        ];
        for source in sources {
            let parsed = parse(source, &VARS).unwrap();
            let reparsed = parse(&parsed.to_string(), &VARS).unwrap();
            assert_eq!(parsed, reparsed, "{source}");
        }
    }
}
