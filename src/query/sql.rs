use sqlparser::{
    ast::{BinaryOperator, Expr, UnaryOperator, Value, ValueWithSpan},
    dialect::GenericDialect,
    parser::Parser,
};

use super::{
    ComparisonOp, LogicalOp, Node, Predicate, PredicateTranslator, TranslateError, FIELD_TAG_KEY,
    MEASUREMENT_TAG_KEY,
};

/// Translates SQL `WHERE`-clause expressions such as
/// `host = 'a' AND (region != 'west' OR _field LIKE 'cpu%')`.
///
/// Identifiers are tag references, except `_measurement` and `_field`
/// (mapped to the storage tag keys) and `_value` (a field reference).
/// Comparisons must put the reference on the left.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqlPredicateTranslator;

impl PredicateTranslator for SqlPredicateTranslator {
    fn translate(&self, expr: &str) -> Result<Predicate, TranslateError> {
        let dialect = GenericDialect {};
        let ast = Parser::new(&dialect)
            .try_with_sql(expr)
            .and_then(|mut parser| parser.parse_expr())
            .map_err(|e| TranslateError::ParseError(e.to_string()))?;
        Ok(Predicate {
            root: to_node(&ast)?,
        })
    }
}

fn to_node(expr: &Expr) -> Result<Node, TranslateError> {
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => logical(LogicalOp::And, left, right),
            BinaryOperator::Or => logical(LogicalOp::Or, left, right),
            _ => comparison(left, op, right),
        },
        Expr::Nested(inner) => Ok(Node::Paren(Box::new(to_node(inner)?))),
        Expr::Like {
            negated,
            expr,
            pattern,
            ..
        } => starts_with(*negated, expr, pattern),
        _ => Err(TranslateError::UnsupportedFeature(format!(
            "Unsupported expression: {expr}"
        ))),
    }
}

fn logical(op: LogicalOp, left: &Expr, right: &Expr) -> Result<Node, TranslateError> {
    Ok(Node::Logical {
        op,
        children: vec![to_node(left)?, to_node(right)?],
    })
}

fn comparison(left: &Expr, op: &BinaryOperator, right: &Expr) -> Result<Node, TranslateError> {
    let op = match op {
        BinaryOperator::Eq => ComparisonOp::Equal,
        BinaryOperator::NotEq => ComparisonOp::NotEqual,
        BinaryOperator::Lt => ComparisonOp::Lt,
        BinaryOperator::LtEq => ComparisonOp::Lte,
        BinaryOperator::Gt => ComparisonOp::Gt,
        BinaryOperator::GtEq => ComparisonOp::Gte,
        BinaryOperator::PGRegexMatch => ComparisonOp::Regex,
        BinaryOperator::PGRegexNotMatch => ComparisonOp::NotRegex,
        _ => {
            return Err(TranslateError::UnsupportedFeature(format!(
                "Unsupported operator: {op}"
            )))
        }
    };
    let value = match op {
        ComparisonOp::Regex | ComparisonOp::NotRegex => Node::RegexValue(string_literal(right)?),
        _ => literal(right)?,
    };
    Ok(Node::Comparison {
        op,
        children: vec![reference(left)?, value],
    })
}

// Only prefix patterns map onto the storage startsWith operator.
fn starts_with(negated: bool, expr: &Expr, pattern: &Expr) -> Result<Node, TranslateError> {
    if negated {
        return Err(TranslateError::UnsupportedFeature("NOT LIKE".into()));
    }
    let pattern = string_literal(pattern)?;
    let prefix = pattern.strip_suffix('%').unwrap_or(pattern.as_str());
    if prefix.contains(['%', '_']) {
        return Err(TranslateError::UnsupportedFeature(format!(
            "LIKE pattern {pattern:?} is not a prefix match"
        )));
    }
    let op = if prefix.len() == pattern.len() {
        ComparisonOp::Equal
    } else {
        ComparisonOp::StartsWith
    };
    Ok(Node::Comparison {
        op,
        children: vec![reference(expr)?, Node::StringValue(prefix.to_string())],
    })
}

fn reference(expr: &Expr) -> Result<Node, TranslateError> {
    let Expr::Identifier(ident) = expr else {
        return Err(TranslateError::UnsupportedFeature(format!(
            "Complex left expressions not supported, expr: {expr}"
        )));
    };
    Ok(match ident.value.as_str() {
        "_measurement" => Node::TagRef(MEASUREMENT_TAG_KEY.to_string()),
        "_field" => Node::TagRef(FIELD_TAG_KEY.to_string()),
        "_value" => Node::FieldRef("_value".to_string()),
        key => Node::TagRef(key.to_string()),
    })
}

fn string_literal(expr: &Expr) -> Result<String, TranslateError> {
    match expr {
        Expr::Value(ValueWithSpan {
            value: Value::SingleQuotedString(s),
            ..
        }) => Ok(s.clone()),
        _ => Err(TranslateError::InvalidArgument(format!(
            "Expected string literal, got {expr}"
        ))),
    }
}

fn literal(expr: &Expr) -> Result<Node, TranslateError> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => match value {
            Value::Number(n, _) => number(n, false),
            Value::SingleQuotedString(s) => Ok(Node::StringValue(s.clone())),
            Value::Boolean(b) => Ok(Node::BooleanValue(*b)),
            _ => Err(TranslateError::UnsupportedFeature(format!(
                "Unsupported literal: {value}"
            ))),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match expr.as_ref() {
            Expr::Value(ValueWithSpan {
                value: Value::Number(n, _),
                ..
            }) => number(n, true),
            _ => Err(TranslateError::UnsupportedFeature(format!(
                "Complex right expressions not supported: {expr}"
            ))),
        },
        _ => Err(TranslateError::UnsupportedFeature(format!(
            "Complex right expressions not supported: {expr}"
        ))),
    }
}

fn number(n: &str, negative: bool) -> Result<Node, TranslateError> {
    let invalid = || TranslateError::InvalidArgument(format!("Invalid number: {n}"));
    if n.contains(['.', 'e', 'E']) {
        let v: f64 = n.parse().map_err(|_| invalid())?;
        return Ok(Node::FloatValue(if negative { -v } else { v }));
    }
    let signed = if negative { format!("-{n}") } else { n.to_string() };
    match signed.parse::<i64>() {
        Ok(v) => Ok(Node::IntegerValue(v)),
        Err(_) if !negative => n.parse::<u64>().map(Node::UnsignedValue).map_err(|_| invalid()),
        Err(_) => Err(invalid()),
    }
}
