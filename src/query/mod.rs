//! Read predicates and their translation into the storage wire form.

use std::fmt;

#[cfg(feature = "sql")]
mod sql;

#[cfg(feature = "sql")]
pub use sql::SqlPredicateTranslator;

#[cfg(test)]
mod tests;

/// Tag key under which storage nodes index the measurement name.
pub const MEASUREMENT_TAG_KEY: &str = "\x00";
/// Tag key under which storage nodes index the field name.
pub const FIELD_TAG_KEY: &str = "\u{ff}";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no predicate translator configured")]
    NoTranslator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    StartsWith,
    Regex,
    NotRegex,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Node of a wire predicate tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Logical { op: LogicalOp, children: Vec<Node> },
    Comparison { op: ComparisonOp, children: Vec<Node> },
    Paren(Box<Node>),
    TagRef(String),
    FieldRef(String),
    StringValue(String),
    BooleanValue(bool),
    IntegerValue(i64),
    UnsignedValue(u64),
    FloatValue(f64),
    RegexValue(String),
}

impl Node {
    /// Tag keys referenced anywhere below this node.
    pub fn tag_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_tag_refs(&mut refs);
        refs
    }

    fn collect_tag_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Node::Logical { children, .. } | Node::Comparison { children, .. } => {
                children.iter().for_each(|c| c.collect_tag_refs(refs));
            }
            Node::Paren(inner) => inner.collect_tag_refs(refs),
            Node::TagRef(key) => refs.push(key),
            _ => {}
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Logical { op, children } => {
                let sep = match op {
                    LogicalOp::And => " AND ",
                    LogicalOp::Or => " OR ",
                };
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Node::Comparison { op, children } => {
                let op = match op {
                    ComparisonOp::Equal => "=",
                    ComparisonOp::NotEqual => "!=",
                    ComparisonOp::StartsWith => "startsWith",
                    ComparisonOp::Regex => "=~",
                    ComparisonOp::NotRegex => "!~",
                    ComparisonOp::Lt => "<",
                    ComparisonOp::Lte => "<=",
                    ComparisonOp::Gt => ">",
                    ComparisonOp::Gte => ">=",
                };
                match children.as_slice() {
                    [l, r] => write!(f, "{l} {op} {r}"),
                    _ => write!(f, "{op}(?)"),
                }
            }
            Node::Paren(inner) => write!(f, "({inner})"),
            Node::TagRef(key) => match key.as_str() {
                MEASUREMENT_TAG_KEY => f.write_str("_measurement"),
                FIELD_TAG_KEY => f.write_str("_field"),
                key => f.write_str(key),
            },
            Node::FieldRef(name) => write!(f, "${name}"),
            Node::StringValue(s) => write!(f, "'{s}'"),
            Node::BooleanValue(b) => write!(f, "{b}"),
            Node::IntegerValue(i) => write!(f, "{i}"),
            Node::UnsignedValue(u) => write!(f, "{u}u"),
            Node::FloatValue(v) => write!(f, "{v:?}"),
            Node::RegexValue(r) => write!(f, "/{r}/"),
        }
    }
}

/// Predicate shipped to storage nodes with a read request.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub root: Node,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

/// Turns the query engine's predicate expression into a wire predicate.
pub trait PredicateTranslator: Send + Sync {
    fn translate(&self, expr: &str) -> Result<Predicate, TranslateError>;
}
