//! Operator definitions for Decaf expressions.

use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,

    // Relational
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // Equality
    /// `==`
    Equal,
    /// `!=`
    NotEqual,

    // Logical
    /// `&&`
    And,
    /// `||`
    Or,
}

/// How the type checker and code generator treat a [`BinaryOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCategory {
    Arithmetic,
    Relational,
    Equality,
    Logical,
}

impl BinaryOp {
    /// Parse the source spelling of a binary operator.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "<" => BinaryOp::Less,
            "<=" => BinaryOp::LessEqual,
            ">" => BinaryOp::Greater,
            ">=" => BinaryOp::GreaterEqual,
            "==" => BinaryOp::Equal,
            "!=" => BinaryOp::NotEqual,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        })
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub const fn category(self) -> OpCategory {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                OpCategory::Arithmetic
            }
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                OpCategory::Relational
            }
            BinaryOp::Equal | BinaryOp::NotEqual => OpCategory::Equality,
            BinaryOp::And | BinaryOp::Or => OpCategory::Logical,
        }
    }

    /// `&&` and `||`, whose right operand is evaluated conditionally.
    pub const fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `!`
    Not,
}

impl UnaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "-" => Some(UnaryOp::Neg),
            "!" => Some(UnaryOp::Not),
            _ => None,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `++` / `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncDecOp {
    Increment,
    Decrement,
}

impl IncDecOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "++" => Some(IncDecOp::Increment),
            "--" => Some(IncDecOp::Decrement),
            _ => None,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            IncDecOp::Increment => "++",
            IncDecOp::Decrement => "--",
        }
    }
}

impl fmt::Display for IncDecOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_symbols_round_trip() {
        for symbol in ["+", "-", "*", "/", "<", "<=", ">", ">=", "==", "!=", "&&", "||"] {
            let op = BinaryOp::from_symbol(symbol).unwrap();
            assert_eq!(op.to_string(), symbol);
        }
        assert_eq!(BinaryOp::from_symbol("%"), None);
    }

    #[test]
    fn categories() {
        assert_eq!(BinaryOp::Div.category(), OpCategory::Arithmetic);
        assert_eq!(BinaryOp::GreaterEqual.category(), OpCategory::Relational);
        assert_eq!(BinaryOp::NotEqual.category(), OpCategory::Equality);
        assert!(BinaryOp::Or.is_short_circuit());
        assert!(!BinaryOp::Equal.is_short_circuit());
    }

    #[test]
    fn unary_and_inc_dec() {
        assert_eq!(UnaryOp::from_symbol("!"), Some(UnaryOp::Not));
        assert_eq!(UnaryOp::from_symbol("~"), None);
        assert_eq!(IncDecOp::from_symbol("--"), Some(IncDecOp::Decrement));
    }
}
