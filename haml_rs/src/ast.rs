use crate::element::Element;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub indentation: isize, // -1 for the document root
    pub raw_text: String,
    pub text: String,
    pub line_no: usize,
    pub trailing_blank_lines: usize,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Literal,
    Element(Element),
    Doctype(Doctype),
    HtmlComment,
    ConditionalComment { condition: String, inline: String },
    SilentComment,
    Variable,
    Directive(Directive),
    Filter(Filter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Doctype {
    Transitional, // !!!
    Strict,
    Frameset,
    Html5, // !!! 5
    Xhtml11,
}

impl Doctype {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "" => Some(Doctype::Transitional),
            "Strict" => Some(Doctype::Strict),
            "Frameset" => Some(Doctype::Frameset),
            "5" => Some(Doctype::Html5),
            "1.1" => Some(Doctype::Xhtml11),
            _ => None,
        }
    }

    pub fn declaration(self) -> &'static str {
        match self {
            Doctype::Transitional => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">",
            Doctype::Strict => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">",
            Doctype::Frameset => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Frameset//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd\">",
            Doctype::Html5 => "<!DOCTYPE html>",
            Doctype::Xhtml11 => "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub statement: String, // "for item in items"
    pub keyword: String,   // "for"
    pub closer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub kind: FilterKind,
    pub lines: Vec<RawLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Plain,
    Python,
    Javascript,
    CoffeeScript,
    Css,
    Stylus,
    CData,
    Highlight,
}

impl FilterKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            ":plain" => Some(FilterKind::Plain),
            ":python" => Some(FilterKind::Python),
            ":javascript" => Some(FilterKind::Javascript),
            ":coffeescript" | ":coffee" => Some(FilterKind::CoffeeScript),
            ":css" => Some(FilterKind::Css),
            ":stylus" => Some(FilterKind::Stylus),
            ":cdata" => Some(FilterKind::CData),
            ":highlight" => Some(FilterKind::Highlight),
            _ => None,
        }
    }
}

/// An unclassified line inside a filter body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub indentation: usize,
    pub raw_text: String,
    pub text: String,
    pub line_no: usize,
    pub trailing_blank_lines: usize,
}

impl RawLine {
    pub fn new(line: &str, line_no: usize) -> Self {
        let raw_text = line.trim_end().to_string();
        Self {
            indentation: indentation_of(&raw_text),
            text: raw_text.trim().to_string(),
            raw_text,
            line_no,
            trailing_blank_lines: 0,
        }
    }

    pub fn leading_space(&self) -> String {
        leading_space(&self.raw_text, self.indentation)
    }

    /// The line with at most `width` leading characters removed.
    pub fn dedented(&self, width: usize) -> &str {
        let cut = width.min(self.indentation);
        match self.raw_text.char_indices().nth(cut) {
            Some((idx, _)) => &self.raw_text[idx..],
            None => "",
        }
    }
}

impl Node {
    pub fn root() -> Self {
        Self {
            kind: NodeKind::Root,
            indentation: -1,
            raw_text: String::new(),
            text: String::new(),
            line_no: 0,
            trailing_blank_lines: 0,
            children: Vec::new(),
        }
    }

    pub fn new(kind: NodeKind, raw_text: &str, line_no: usize) -> Self {
        Self {
            kind,
            indentation: indentation_of(raw_text) as isize,
            raw_text: raw_text.to_string(),
            text: raw_text.trim().to_string(),
            line_no,
            trailing_blank_lines: 0,
            children: Vec::new(),
        }
    }

    pub fn leading_space(&self) -> String {
        leading_space(&self.raw_text, self.indentation.max(0) as usize)
    }

    pub fn keyword(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Directive(d) => Some(d.keyword.as_str()),
            _ => None,
        }
    }

    pub fn nukes_outer_whitespace(&self) -> bool {
        matches!(&self.kind, NodeKind::Element(e) if e.nuke_outer_whitespace)
    }
}

pub fn indentation_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// The line's own indentation character, repeated.
fn leading_space(line: &str, width: usize) -> String {
    match line.chars().next() {
        Some(c) if width > 0 => std::iter::repeat(c).take(width).collect(),
        _ => String::new(),
    }
}
