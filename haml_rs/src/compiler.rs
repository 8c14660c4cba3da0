use crate::ast::{Directive, Node, NodeKind};
use crate::element::Element;
use crate::error::HamlError;
use crate::filters::{self, CodeExecutor, Highlighter, PlainHighlighter};
use crate::parser;
use crate::types::DirectiveRules;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `#{name}` placeholders in inline content.
static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\{([a-zA-Z0-9._]+)\}").unwrap());

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CompileOptions {
    pub directives: DirectiveRules,
}

impl CompileOptions {
    pub fn from_json(text: &str) -> Result<Self, HamlError> {
        Ok(serde_json::from_str(text)?)
    }
}

pub struct Compiler {
    options: CompileOptions,
    highlighter: Box<dyn Highlighter>,
    executor: Option<Box<dyn CodeExecutor>>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            options: CompileOptions::default(),
            highlighter: Box::new(PlainHighlighter),
            executor: None,
        }
    }
}

/// Rendered siblings, plus whether the first or last of them asked to eat
/// the whitespace the parent would put around them.
struct Siblings {
    text: String,
    nuked_first: bool,
    nuked_last: bool,
}

impl Siblings {
    fn nuked(&self) -> bool {
        self.nuked_first || self.nuked_last
    }

    fn pre_space(&self) -> &'static str {
        if self.nuked_first {
            ""
        } else {
            "\n"
        }
    }

    fn post_space(&self, node: &Node) -> String {
        if self.nuked_last {
            String::new()
        } else {
            node.leading_space()
        }
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.highlighter = Box::new(highlighter);
        self
    }

    /// Enables `:python` filters. The executor runs with the privileges of
    /// the host process.
    pub fn with_executor(mut self, executor: impl CodeExecutor + 'static) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn compile(&self, text: &str) -> Result<String, HamlError> {
        let root = parser::parse(text, &self.options.directives)?;
        self.render(&root)
    }

    pub fn render(&self, node: &Node) -> Result<String, HamlError> {
        match &node.kind {
            NodeKind::Root => Ok(self.render_children(&node.children)?.text),
            NodeKind::Literal => Ok(format!(
                "{}{}{}{}",
                node.leading_space(),
                node.text,
                newlines(node.trailing_blank_lines + 1),
                self.render_children(&node.children)?.text
            )),
            NodeKind::Element(element) => self.render_element(node, element),
            NodeKind::Doctype(doctype) => Ok(format!(
                "{}{}",
                doctype.declaration(),
                newlines(node.trailing_blank_lines + 1)
            )),
            NodeKind::HtmlComment => {
                let content = if node.children.is_empty() {
                    format!("{} ", node.text.trim_start_matches('/').trim())
                } else {
                    format!("\n{}", self.render_children(&node.children)?.text)
                };
                Ok(format!("<!-- {}-->\n", content))
            }
            NodeKind::ConditionalComment { condition, inline } => {
                self.render_conditional(node, condition, inline)
            }
            NodeKind::SilentComment => Ok(newlines(node.trailing_blank_lines)),
            NodeKind::Variable => {
                let expression = node.text.trim_start_matches('=');
                let (content, blank) = self.tag_content(node, expression, true)?;
                Ok(format!(
                    "{}{}{}",
                    node.leading_space(),
                    content,
                    newlines(blank + 1)
                ))
            }
            NodeKind::Directive(directive) => self.render_directive(node, directive),
            NodeKind::Filter(filter) => filters::render(
                node,
                filter,
                &*self.highlighter,
                self.executor.as_deref(),
            ),
        }
    }

    fn render_children(&self, children: &[Node]) -> Result<Siblings, HamlError> {
        let mut parts = children
            .iter()
            .map(|child| self.render(child))
            .collect::<Result<Vec<_>, _>>()?;

        let mut nuked_first = false;
        let mut nuked_last = false;
        for (i, child) in children.iter().enumerate() {
            if !child.nukes_outer_whitespace() {
                continue;
            }
            if i > 0 {
                parts[i - 1] = parts[i - 1].trim_end().to_string();
            } else {
                nuked_first = true;
            }
            parts[i] = parts[i].trim().to_string();
            if i + 1 < parts.len() {
                parts[i + 1] = parts[i + 1].trim_start().to_string();
            } else {
                nuked_last = true;
            }
        }

        Ok(Siblings {
            text: parts.concat(),
            nuked_first,
            nuked_last,
        })
    }

    /// Body of an element or variable, and the blank-line count left after
    /// children had their say about surrounding whitespace.
    fn tag_content(
        &self,
        node: &Node,
        inline: &str,
        as_variable: bool,
    ) -> Result<(String, usize), HamlError> {
        let mut blank = node.trailing_blank_lines;
        let mut content = if node.children.is_empty() {
            inline.to_string()
        } else {
            let inner = self.render_children(&node.children)?;
            if inner.nuked() {
                blank = 0;
            }
            format!(
                "{}{}{}",
                inner.pre_space(),
                inner.text,
                inner.post_space(node)
            )
        };
        if as_variable {
            content = format!("{{{{ {} }}}}", content.trim());
        }
        Ok((interpolate(&content), blank))
    }

    fn render_element(&self, node: &Node, element: &Element) -> Result<String, HamlError> {
        let mut out = if node.indentation > 0 {
            format!("{}<{}", node.leading_space(), element.tag)
        } else {
            format!("<{}", element.tag)
        };
        if !element.id.is_empty() {
            out.push_str(&format!(" id='{}'", element.id));
        }
        if !element.classes.is_empty() {
            out.push_str(&format!(" class='{}'", element.classes));
        }
        if !element.attributes.is_empty() {
            out.push(' ');
            out.push_str(&element.attributes);
        }

        let (mut content, blank) =
            self.tag_content(node, &element.inline_content, element.django_variable)?;
        if element.nuke_inner_whitespace {
            content = content.trim().to_string();
        }

        if element.self_close && content.is_empty() {
            out.push_str(" />");
            out.push_str(&newlines(blank + 1));
        } else if !element.inline_content.is_empty() {
            let trailing = if element.nuke_outer_whitespace {
                String::new()
            } else {
                newlines(blank + 1)
            };
            out.push_str(&format!(">{}</{}>{}", content, element.tag, trailing));
        } else if node.children.is_empty() {
            out.push_str(&format!(">{}</{}>\n{}", content, element.tag, newlines(blank)));
        } else {
            let leading = if element.nuke_inner_whitespace {
                String::new()
            } else {
                newlines(blank)
            };
            out.push_str(&format!(">{}{}</{}>\n", leading, content, element.tag));
        }
        Ok(out)
    }

    fn render_conditional(
        &self,
        node: &Node,
        condition: &str,
        inline: &str,
    ) -> Result<String, HamlError> {
        let mut blank = node.trailing_blank_lines;
        let (space, content, post) = if node.children.is_empty() {
            ("", inline.to_string(), node.leading_space())
        } else {
            let inner = self.render_children(&node.children)?;
            if inner.nuked() {
                blank = 0;
            }
            let post = inner.post_space(node);
            (inner.pre_space(), inner.text, post)
        };
        Ok(format!(
            "<!--{}>{}{}{}<![endif]-->{}",
            condition,
            space,
            content,
            post,
            newlines(blank + 1)
        ))
    }

    fn render_directive(&self, node: &Node, directive: &Directive) -> Result<String, HamlError> {
        let inner = self.render_children(&node.children)?;
        let blank = if inner.nuked() {
            0
        } else {
            node.trailing_blank_lines
        };
        let spaces = node.leading_space();
        let mut out = format!(
            "{}{{% {} %}}{}{}{}",
            spaces,
            directive.statement,
            newlines(blank),
            inner.pre_space(),
            inner.text
        );
        if let Some(closer) = &directive.closer {
            out.push_str(&format!("{}{{% {} %}}\n", inner.post_space(node), closer));
        }
        Ok(out)
    }
}

fn newlines(count: usize) -> String {
    "\n".repeat(count)
}

fn interpolate(text: &str) -> String {
    INTERPOLATION.replace_all(text, "{{ $1 }}").into_owned()
}
