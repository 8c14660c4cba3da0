//! Parsing of a single element line: `%tag#id.class{attrs}><=/ inline`.

use crate::error::HamlError;
use once_cell::sync::Lazy;
use regex::Regex;
use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

const SELF_CLOSING_TAGS: &[&str] = &[
    "meta", "img", "link", "br", "hr", "input", "source", "track",
];

/// `= somevar` inside an attribute value.
static DJANGO_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*=\s(?P<variable>[a-zA-Z_][a-zA-Z0-9._-]*)\s*$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub id: String,
    pub classes: String,
    pub attributes: String, // rendered, e.g. `href='/' disabled`
    pub inline_content: String,
    pub self_close: bool,
    pub nuke_inner_whitespace: bool,
    pub nuke_outer_whitespace: bool,
    pub django_variable: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum AttrValue {
    Str(String),
    Number(String),
    Null,
    List(Vec<String>),
}

impl AttrValue {
    fn into_parts(self) -> Vec<String> {
        match self {
            AttrValue::Str(s) | AttrValue::Number(s) => vec![s],
            AttrValue::Null => vec![],
            AttrValue::List(items) => items,
        }
    }
}

enum Selector<'s> {
    Id(&'s str),
    Class(&'s str),
}

struct Shorthand<'s> {
    tag: Option<&'s str>,
    selectors: Vec<Selector<'s>>,
    attributes: Option<&'s str>,
    nuke_outer: bool,
    nuke_inner: bool,
    self_close: bool,
    django_variable: bool,
}

/// Parses the stripped text of an element line.
pub fn parse(haml: &str, line_no: usize) -> Result<Element, HamlError> {
    let mut input = haml.trim();
    let sh = shorthand.parse_next(&mut input).map_err(|_| HamlError::Element {
        line: line_no,
        message: format!("unbalanced attribute braces in `{}`", haml.trim()),
    })?;

    let entries = match sh.attributes {
        Some(text) => attribute_dict
            .parse_next(&mut &*text)
            .map_err(|_| HamlError::Element {
                line: line_no,
                message: format!("failed to decode attributes `{}`", text),
            })?,
        None => Vec::new(),
    };

    let mut ids: Vec<String> = Vec::new();
    let mut classes: Vec<String> = Vec::new();
    for selector in &sh.selectors {
        match selector {
            Selector::Id(id) => ids.push(id.to_string()),
            Selector::Class(class) => classes.push(class.to_string()),
        }
    }

    let mut attributes: Vec<String> = Vec::new();
    for (key, value) in entries {
        match key.as_str() {
            "id" => ids.extend(value.into_parts()),
            "class" => classes.extend(value.into_parts()),
            _ => match value {
                AttrValue::Null => attributes.push(key),
                AttrValue::Number(n) => attributes.push(format!("{}='{}'", key, n)),
                AttrValue::Str(s) => attributes.push(render_attribute(&key, &s)),
                AttrValue::List(items) => {
                    attributes.push(render_attribute(&key, &items.join(" ")))
                }
            },
        }
    }

    let tag = sh.tag.unwrap_or("div").to_string();
    let self_close = sh.self_close || SELF_CLOSING_TAGS.contains(&tag.as_str());

    Ok(Element {
        id: join_non_empty(&ids, "_"),
        classes: join_non_empty(&classes, " "),
        attributes: attributes.join(" "),
        inline_content: input.trim().to_string(),
        self_close,
        nuke_inner_whitespace: sh.nuke_inner,
        nuke_outer_whitespace: sh.nuke_outer,
        django_variable: sh.django_variable,
        tag,
    })
}

/// Whether the line's attribute dictionary is opened but not yet closed,
/// meaning the following source lines continue it.
pub(crate) fn has_unclosed_attributes(line: &str) -> bool {
    let mut input = line.trim_start();
    let prefix: ModalResult<(Option<&str>, Vec<Selector<'_>>)> =
        (opt(tag_name), repeat(0.., selector)).parse_next(&mut input);
    if prefix.is_err() {
        return false;
    }
    matches!(braced.parse_next(&mut input), Err(ErrMode::Cut(_)))
}

fn join_non_empty(parts: &[String], sep: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn render_attribute(key: &str, value: &str) -> String {
    let value = DJANGO_VARIABLE.replace(value, "{{${variable}}}");
    format!("{}='{}'", key, escape_attribute_quotes(&value))
}

/// Backslash-escapes single quotes, except inside `{% ... %}` tags.
fn escape_attribute_quotes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut inside_tag = false;
    for (idx, ch) in value.char_indices() {
        let rest = &value[idx..];
        if rest.starts_with("{%") {
            inside_tag = true;
        } else if rest.starts_with("%}") {
            inside_tag = false;
        }
        if ch == '\'' && !inside_tag {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn shorthand<'s>(input: &mut &'s str) -> ModalResult<Shorthand<'s>> {
    (
        opt(tag_name),
        repeat(0.., selector),
        opt(braced),
        opt('>'),
        opt('<'),
        opt('/'),
        opt('='),
    )
        .map(
            |(tag, selectors, attributes, outer, inner, close, variable): (
                Option<&'s str>,
                Vec<Selector<'s>>,
                Option<&'s str>,
                Option<char>,
                Option<char>,
                Option<char>,
                Option<char>,
            )| Shorthand {
                tag,
                selectors,
                attributes,
                nuke_outer: outer.is_some(),
                nuke_inner: inner.is_some(),
                self_close: close.is_some(),
                django_variable: variable.is_some(),
            },
        )
        .parse_next(input)
}

fn word<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn namespaced_word<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '-').parse_next(input)
}

fn tag_name<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    preceded('%', (word, opt((':', namespaced_word))).take()).parse_next(input)
}

fn selector_name<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(0.., |c: char| c.is_alphanumeric() || c == '_' || c == '-').parse_next(input)
}

fn selector<'s>(input: &mut &'s str) -> ModalResult<Selector<'s>> {
    alt((
        preceded('#', selector_name).map(Selector::Id),
        preceded('.', selector_name).map(Selector::Class),
    ))
    .parse_next(input)
}

/// A `{...}` block, balanced and quote-aware.
fn braced<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    let s: &'s str = *input;
    if !s.starts_with('{') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = idx + ch.len_utf8();
                    *input = &s[end..];
                    return Ok(&s[..end]);
                }
            }
            _ => {}
        }
    }
    Err(ErrMode::Cut(ContextError::new()))
}

fn attribute_dict(input: &mut &str) -> ModalResult<Vec<(String, AttrValue)>> {
    delimited(
        ('{', multispace0),
        separated(0.., attribute_entry, (multispace0, ',', multispace0)),
        (multispace0, opt(','), multispace0, '}'),
    )
    .parse_next(input)
}

fn attribute_entry(input: &mut &str) -> ModalResult<(String, AttrValue)> {
    (
        attribute_key,
        multispace0,
        alt(("=>", ":")),
        multispace0,
        attribute_value,
    )
        .map(|(key, _, _, _, value)| (key, value))
        .parse_next(input)
}

fn attribute_key(input: &mut &str) -> ModalResult<String> {
    alt((
        quoted,
        preceded(opt(':'), key_name).map(|s: &str| s.to_string()),
    ))
    .parse_next(input)
}

fn key_name<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    )
        .take()
        .parse_next(input)
}

fn attribute_value(input: &mut &str) -> ModalResult<AttrValue> {
    alt((
        quoted.map(AttrValue::Str),
        "None".value(AttrValue::Null),
        number.map(|n: &str| AttrValue::Number(n.to_string())),
        list.map(AttrValue::List),
    ))
    .parse_next(input)
}

fn number<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (
        opt('-'),
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.'),
    )
        .take()
        .parse_next(input)
}

fn list(input: &mut &str) -> ModalResult<Vec<String>> {
    alt((
        delimited(
            ('[', multispace0),
            quoted_items,
            (multispace0, opt(','), multispace0, ']'),
        ),
        delimited(
            ('(', multispace0),
            quoted_items,
            (multispace0, opt(','), multispace0, ')'),
        ),
    ))
    .parse_next(input)
}

fn quoted_items(input: &mut &str) -> ModalResult<Vec<String>> {
    separated(0.., quoted, (multispace0, ',', multispace0)).parse_next(input)
}

/// A single or double quoted string, backslash escapes resolved.
fn quoted(input: &mut &str) -> ModalResult<String> {
    let s: &str = *input;
    let quote = match s.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return Err(ErrMode::Backtrack(ContextError::new())),
    };
    let body = &s[quote.len_utf8()..];
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\\' {
            if let Some((_, escaped)) = chars.next() {
                out.push(escaped);
            }
            continue;
        }
        if ch == quote {
            *input = &body[idx + ch.len_utf8()..];
            return Ok(out);
        }
        out.push(ch);
    }
    Err(ErrMode::Cut(ContextError::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn el(text: &str) -> Element {
        parse(text, 1).unwrap()
    }

    #[test]
    fn defaults_to_div() {
        let e = el(".foo#bar");
        assert_eq!(e.tag, "div");
        assert_eq!(e.id, "bar");
        assert_eq!(e.classes, "foo");
        assert!(!e.self_close);
    }

    #[test]
    fn multiple_classes_and_inline_text() {
        let e = el("%p.a.b-c.d_e Hello there");
        assert_eq!(e.tag, "p");
        assert_eq!(e.classes, "a b-c d_e");
        assert_eq!(e.inline_content, "Hello there");
    }

    #[test]
    fn namespaced_tag() {
        assert_eq!(el("%fb:login-button").tag, "fb:login-button");
        assert_eq!(el("%fb:login-button").inline_content, "");
        assert_eq!(el("%fb:like").tag, "fb:like");
    }

    #[rstest]
    #[case("%br", true)]
    #[case("%img", true)]
    #[case("%div/", true)]
    #[case("%div", false)]
    #[case("%span", false)]
    fn self_closing(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(el(text).self_close, expected);
    }

    #[test]
    fn whitespace_and_variable_flags() {
        let e = el("%p><= greeting");
        assert!(e.nuke_outer_whitespace);
        assert!(e.nuke_inner_whitespace);
        assert!(e.django_variable);
        assert_eq!(e.inline_content, "greeting");

        let e = el("%p< text");
        assert!(!e.nuke_outer_whitespace);
        assert!(e.nuke_inner_whitespace);
    }

    #[test]
    fn python_style_attributes() {
        let e = el("%a{'href': '/home', 'data-x': 5, 'disabled': None} Home");
        assert_eq!(e.attributes, "href='/home' data-x='5' disabled");
        assert_eq!(e.inline_content, "Home");
    }

    #[test]
    fn ruby_and_bare_keys() {
        let e = el("%a{:href => \"/x\", title: 'T'}");
        assert_eq!(e.attributes, "href='/x' title='T'");
    }

    #[test]
    fn id_and_class_from_dictionary() {
        let e = el("%div#main.box{'id': ['a', 'b'], 'class': ('c', 'd')}");
        assert_eq!(e.id, "main_a_b");
        assert_eq!(e.classes, "box c d");

        let e = el("%div{'id': 'only'}");
        assert_eq!(e.id, "only");
    }

    #[test]
    fn django_variable_in_attribute() {
        let e = el("%a{'href': '= url'}");
        assert_eq!(e.attributes, "href='{{url}}'");
    }

    #[test]
    fn quotes_escaped_outside_tags() {
        let e = el(r#"%a{'title': "it's {% trans 'x' %}"}"#);
        assert_eq!(e.attributes, r"title='it\'s {% trans 'x' %}'");
    }

    #[test]
    fn braces_inside_quotes_do_not_close() {
        let e = el("%a{'title': 'a}b'} after");
        assert_eq!(e.attributes, "title='a}b'");
        assert_eq!(e.inline_content, "after");
    }

    #[test]
    fn trailing_comma_and_newlines() {
        let e = el("%a{'a': '1',\n    'b': '2',}");
        assert_eq!(e.attributes, "a='1' b='2'");
    }

    #[rstest]
    #[case("%a{'href': '/',", true)]
    #[case("%a.btn#go{", true)]
    #[case("%a{'title': 'x{'} Go", false)]
    #[case("%a{'title': \"}\"", true)]
    #[case("%script var o = {", false)]
    #[case("%p text {", false)]
    #[case("%a{'x': '1'}", false)]
    fn open_attribute_dictionary(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(has_unclosed_attributes(line), expected);
    }

    #[test]
    fn unbalanced_braces_fail() {
        let err = parse("%a{'href': '/'", 7).unwrap_err();
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn malformed_dictionary_fails() {
        assert!(matches!(
            parse("%a{href}", 3),
            Err(HamlError::Element { line: 3, .. })
        ));
    }
}
