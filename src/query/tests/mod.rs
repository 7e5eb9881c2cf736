use super::*;

fn tag_eq(key: &str, value: &str) -> Node {
    Node::Comparison {
        op: ComparisonOp::Equal,
        children: vec![Node::TagRef(key.to_string()), Node::StringValue(value.to_string())],
    }
}

#[test]
fn test_tag_refs_walks_nested_nodes() {
    let node = Node::Logical {
        op: LogicalOp::And,
        children: vec![
            tag_eq("host", "a"),
            Node::Paren(Box::new(tag_eq(MEASUREMENT_TAG_KEY, "cpu"))),
        ],
    };
    assert_eq!(node.tag_refs(), vec!["host", MEASUREMENT_TAG_KEY]);
}

#[test]
fn test_display_names_special_tag_keys() {
    let node = Node::Logical {
        op: LogicalOp::Or,
        children: vec![tag_eq(MEASUREMENT_TAG_KEY, "cpu"), tag_eq(FIELD_TAG_KEY, "usage")],
    };
    assert_eq!(node.to_string(), "_measurement = 'cpu' OR _field = 'usage'");
}

#[cfg(feature = "sql")]
mod sql {
    use super::*;

    fn translate(expr: &str) -> Result<Predicate, TranslateError> {
        SqlPredicateTranslator.translate(expr)
    }

    #[test]
    fn test_simple_tag_comparison() {
        let p = translate("host = 'server1'").unwrap();
        assert_eq!(p.root, tag_eq("host", "server1"));
    }

    #[test]
    fn test_and_or_with_parentheses() {
        let p = translate("host = 'a' AND (region != 'west' OR region = 'east')").unwrap();
        assert_eq!(
            p.to_string(),
            "host = 'a' AND (region != 'west' OR region = 'east')"
        );
        match &p.root {
            Node::Logical { op, children } => {
                assert_eq!(*op, LogicalOp::And);
                assert!(matches!(children[1], Node::Paren(_)));
            }
            other => panic!("expected logical node, got {other:?}"),
        }
    }

    #[test]
    fn test_special_identifiers() {
        let p = translate("_measurement = 'cpu' AND _field = 'usage'").unwrap();
        assert_eq!(p.root.tag_refs(), vec![MEASUREMENT_TAG_KEY, FIELD_TAG_KEY]);

        let p = translate("_value > 2.5").unwrap();
        assert_eq!(
            p.root,
            Node::Comparison {
                op: ComparisonOp::Gt,
                children: vec![Node::FieldRef("_value".into()), Node::FloatValue(2.5)],
            }
        );
    }

    #[test]
    fn test_numeric_literals() {
        let p = translate("_value <= -3").unwrap();
        assert_eq!(
            p.root,
            Node::Comparison {
                op: ComparisonOp::Lte,
                children: vec![Node::FieldRef("_value".into()), Node::IntegerValue(-3)],
            }
        );

        let p = translate("_value >= 18446744073709551615").unwrap();
        match p.root {
            Node::Comparison { children, .. } => {
                assert_eq!(children[1], Node::UnsignedValue(u64::MAX));
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_like_prefix_becomes_starts_with() {
        let p = translate("host LIKE 'web%'").unwrap();
        assert_eq!(
            p.root,
            Node::Comparison {
                op: ComparisonOp::StartsWith,
                children: vec![Node::TagRef("host".into()), Node::StringValue("web".into())],
            }
        );

        let p = translate("host LIKE 'web1'").unwrap();
        assert_eq!(p.root, tag_eq("host", "web1"));
    }

    #[test]
    fn test_like_with_inner_wildcards_is_rejected() {
        assert!(matches!(
            translate("host LIKE '%web%'"),
            Err(TranslateError::UnsupportedFeature(_))
        ));
        assert!(matches!(
            translate("host NOT LIKE 'web%'"),
            Err(TranslateError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_unsupported_expressions() {
        assert!(matches!(
            translate("host + 1 = 2"),
            Err(TranslateError::UnsupportedFeature(_))
        ));
        assert!(matches!(
            translate("'a' = host"),
            Err(TranslateError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            translate("host = = 'a'"),
            Err(TranslateError::ParseError(_))
        ));
    }
}
