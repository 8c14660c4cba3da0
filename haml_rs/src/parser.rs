use crate::ast::*;
use crate::element;
use crate::error::HamlError;
use crate::tree;
use crate::types::DirectiveRules;
use log::debug;

const ESCAPE: char = '\\';
const DOCTYPE: &str = "!!!";
const ELEMENT_CHARACTERS: [char; 3] = ['%', '#', '.'];
const CONDITIONAL_COMMENT: &str = "/[";
const HTML_COMMENT: char = '/';
const SILENT_COMMENTS: [&str; 2] = ["-#", "=#"];
const VARIABLE: char = '=';
const DIRECTIVE: char = '-';

/// Classifies one source line. Blank lines yield `None`.
pub fn classify(
    line: &str,
    line_no: usize,
    rules: &DirectiveRules,
) -> Result<Option<Node>, HamlError> {
    let stripped = line.trim();
    let Some(first) = stripped.chars().next() else {
        return Ok(None);
    };

    let node = if first == ESCAPE {
        let unescaped = line.replacen(ESCAPE, "", 1);
        Node::new(NodeKind::Literal, unescaped.trim_end(), line_no)
    } else if let Some(token) = stripped.strip_prefix(DOCTYPE) {
        let token = token.trim_start_matches('!').trim();
        let doctype = Doctype::from_token(token).ok_or_else(|| HamlError::UnknownDoctype {
            line: line_no,
            token: token.to_string(),
        })?;
        Node::new(NodeKind::Doctype(doctype), line, line_no)
    } else if ELEMENT_CHARACTERS.contains(&first) {
        let element = element::parse(stripped, line_no)?;
        Node::new(NodeKind::Element(element), line, line_no)
    } else if stripped.starts_with(CONDITIONAL_COMMENT) {
        let close = stripped
            .find(']')
            .ok_or(HamlError::UnterminatedCondition { line: line_no })?;
        let kind = NodeKind::ConditionalComment {
            condition: stripped[1..=close].to_string(),
            inline: stripped[close + 1..].to_string(),
        };
        Node::new(kind, line, line_no)
    } else if first == HTML_COMMENT {
        Node::new(NodeKind::HtmlComment, line, line_no)
    } else if SILENT_COMMENTS.iter().any(|p| stripped.starts_with(p)) {
        Node::new(NodeKind::SilentComment, line, line_no)
    } else if first == VARIABLE {
        Node::new(NodeKind::Variable, line, line_no)
    } else if first == DIRECTIVE {
        let directive = directive(stripped, line_no, rules)?;
        Node::new(NodeKind::Directive(directive), line, line_no)
    } else if let Some(kind) = FilterKind::from_token(stripped) {
        let filter = Filter {
            kind,
            lines: Vec::new(),
        };
        Node::new(NodeKind::Filter(filter), line, line_no)
    } else {
        Node::new(NodeKind::Literal, line.trim_end(), line_no)
    };

    debug!("line {}: classified as {:?}", line_no, kind_name(&node.kind));
    Ok(Some(node))
}

fn directive(
    stripped: &str,
    line_no: usize,
    rules: &DirectiveRules,
) -> Result<Directive, HamlError> {
    let statement = stripped.trim_start_matches(DIRECTIVE).trim().to_string();
    let keyword = statement.split(' ').next().unwrap_or_default().to_string();
    if rules.is_closer(&keyword) {
        return Err(HamlError::ManualClose {
            line: line_no,
            keyword,
        });
    }
    let closer = rules.closer_for(&keyword).map(str::to_string);
    Ok(Directive {
        statement,
        keyword,
        closer,
    })
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Root => "root",
        NodeKind::Literal => "literal",
        NodeKind::Element(_) => "element",
        NodeKind::Doctype(_) => "doctype",
        NodeKind::HtmlComment => "comment",
        NodeKind::ConditionalComment { .. } => "conditional comment",
        NodeKind::SilentComment => "silent comment",
        NodeKind::Variable => "variable",
        NodeKind::Directive(_) => "directive",
        NodeKind::Filter(_) => "filter",
    }
}

/// Builds the document tree for a whole source text.
pub fn parse(input: &str, rules: &DirectiveRules) -> Result<Node, HamlError> {
    let mut root = Node::root();
    let mut lines = input.lines().enumerate();

    while let Some((idx, line)) = lines.next() {
        let line_no = idx + 1;
        let mut raw = line;
        if idx == 0 {
            raw = raw.trim_start_matches('\u{feff}');
        }

        if raw.trim().is_empty() {
            tree::mark_blank_line(&mut root);
            continue;
        }

        let indentation = indentation_of(raw);
        if let Some(filter) = tree::open_filter(&mut root, indentation as isize) {
            debug!("line {}: raw line in {:?} filter", line_no, filter.kind);
            filter.lines.push(RawLine::new(raw, line_no));
            continue;
        }

        let mut joined = raw.to_string();
        if is_element_line(raw) {
            while element::has_unclosed_attributes(&joined) {
                let Some((_, next)) = lines.next() else {
                    return Err(HamlError::UnclosedAttributes { line: line_no });
                };
                joined.push_str(next);
            }
        }

        if let Some(node) = classify(&joined, line_no, rules)? {
            tree::insert(&mut root, node, rules);
        }
    }

    Ok(root)
}

fn is_element_line(line: &str) -> bool {
    line.trim_start()
        .starts_with(|c: char| ELEMENT_CHARACTERS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn kind_of(line: &str) -> &'static str {
        let node = classify(line, 1, &DirectiveRules::default())
            .unwrap()
            .unwrap();
        kind_name(&node.kind)
    }

    #[rstest]
    #[case("Hello", "literal")]
    #[case("  \\%p not a tag", "literal")]
    #[case("!!!", "doctype")]
    #[case("!!! 5", "doctype")]
    #[case("%div", "element")]
    #[case("  #id", "element")]
    #[case(".cls text", "element")]
    #[case("/[if IE]", "conditional comment")]
    #[case("/ note", "comment")]
    #[case("-# hidden", "silent comment")]
    #[case("=# hidden", "silent comment")]
    #[case("= value", "variable")]
    #[case("- for x in y", "directive")]
    #[case(":plain", "filter")]
    #[case(":coffee", "filter")]
    #[case("  :javascript", "filter")]
    #[case(":plainly", "literal")]
    fn classifies_by_prefix(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(kind_of(line), expected);
    }

    #[test]
    fn blank_lines_are_not_nodes() {
        let rules = DirectiveRules::default();
        assert!(classify("", 1, &rules).unwrap().is_none());
        assert!(classify("   \t ", 1, &rules).unwrap().is_none());
    }

    #[test]
    fn escape_removes_one_marker() {
        let node = classify("  \\= not a variable  ", 1, &DirectiveRules::default())
            .unwrap()
            .unwrap();
        assert_eq!(node.kind, NodeKind::Literal);
        assert_eq!(node.text, "= not a variable");
        assert_eq!(node.indentation, 2);
    }

    #[test]
    fn literal_keeps_indentation() {
        let node = classify("    some text   ", 4, &DirectiveRules::default())
            .unwrap()
            .unwrap();
        assert_eq!(node.indentation, 4);
        assert_eq!(node.raw_text, "    some text");
        assert_eq!(node.line_no, 4);
    }

    #[test]
    fn filter_aliases() {
        let rules = DirectiveRules::default();
        for token in [":coffee", ":coffeescript"] {
            let node = classify(token, 1, &rules).unwrap().unwrap();
            match node.kind {
                NodeKind::Filter(f) => assert_eq!(f.kind, FilterKind::CoffeeScript),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn directive_keyword_and_closer() {
        let node = classify("- for item in items", 1, &DirectiveRules::default())
            .unwrap()
            .unwrap();
        match node.kind {
            NodeKind::Directive(d) => {
                assert_eq!(d.statement, "for item in items");
                assert_eq!(d.keyword, "for");
                assert_eq!(d.closer.as_deref(), Some("endfor"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn manual_closer_is_rejected() {
        let err = classify("  - endif", 9, &DirectiveRules::default()).unwrap_err();
        assert!(matches!(err, HamlError::ManualClose { line: 9, ref keyword } if keyword == "endif"));
    }

    #[test]
    fn unknown_doctype_is_rejected() {
        let err = classify("!!! 4.01", 2, &DirectiveRules::default()).unwrap_err();
        assert!(matches!(err, HamlError::UnknownDoctype { line: 2, ref token } if token == "4.01"));
    }

    #[test]
    fn conditional_comment_parts() {
        let node = classify("/[if IE] You use IE", 1, &DirectiveRules::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            node.kind,
            NodeKind::ConditionalComment {
                condition: "[if IE]".to_string(),
                inline: " You use IE".to_string(),
            }
        );
        assert!(matches!(
            classify("/[if IE", 5, &DirectiveRules::default()),
            Err(HamlError::UnterminatedCondition { line: 5 })
        ));
    }

    #[test]
    fn blank_lines_credit_previous_node() {
        let root = parse("%p\n\n\n%div\n", &DirectiveRules::default()).unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].trailing_blank_lines, 2);
        assert_eq!(root.children[1].trailing_blank_lines, 0);
    }

    #[test]
    fn leading_blank_lines_are_dropped() {
        let root = parse("\n\n%p", &DirectiveRules::default()).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].trailing_blank_lines, 0);
    }

    #[test]
    fn multi_line_attributes_are_joined() {
        let root = parse(
            "%a{'href': '/',\n   'title': 'Home'} Home\n%p",
            &DirectiveRules::default(),
        )
        .unwrap();
        assert_eq!(root.children.len(), 2);
        match &root.children[0].kind {
            NodeKind::Element(e) => {
                assert_eq!(e.attributes, "href='/' title='Home'");
                assert_eq!(e.inline_content, "Home");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn braces_in_quotes_or_inline_text_do_not_join() {
        let rules = DirectiveRules::default();
        let root = parse("%a{'title': 'x{'} Go\n%p", &rules).unwrap();
        assert_eq!(root.children.len(), 2);
        let root = parse("%script var o = {\n%p after", &rules).unwrap();
        assert_eq!(root.children.len(), 2);
        match &root.children[0].kind {
            NodeKind::Element(e) => assert_eq!(e.inline_content, "var o = {"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unclosed_multi_line_attributes() {
        let err = parse("%p\n%a{'href': '/',\n  'x': 1", &DirectiveRules::default()).unwrap_err();
        assert!(matches!(err, HamlError::UnclosedAttributes { line: 2 }));
    }

    #[test]
    fn filter_bodies_skip_classification() {
        let root = parse(
            ":css\n  a {\n    color: red;\n  }\n  - endif\n%p",
            &DirectiveRules::default(),
        )
        .unwrap();
        assert_eq!(root.children.len(), 2);
        match &root.children[0].kind {
            NodeKind::Filter(f) => {
                let texts: Vec<&str> = f.lines.iter().map(|l| l.text.as_str()).collect();
                assert_eq!(texts, vec!["a {", "color: red;", "}", "- endif"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let root = parse("\u{feff}%p", &DirectiveRules::default()).unwrap();
        assert!(matches!(root.children[0].kind, NodeKind::Element(_)));
    }

    proptest! {
        #[test]
        fn classification_depends_only_on_the_line(line in "[ %#./=!:a-z\\-\\[\\]]{0,12}") {
            let rules = DirectiveRules::default();
            let first = classify(&line, 1, &rules).map(|n| n.map(|n| n.kind)).ok();
            let second = classify(&line, 1, &rules).map(|n| n.map(|n| n.kind)).ok();
            prop_assert_eq!(first, second);
        }
    }
}
