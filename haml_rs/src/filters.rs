//! Rendering of filter bodies (`:plain`, `:javascript`, `:python`, ...).

use crate::ast::{Filter, FilterKind, Node, RawLine};
use crate::error::HamlError;
use log::{info, warn};

/// Turns a block of source code into highlighted HTML.
pub trait Highlighter {
    fn highlight(&self, code: &str) -> String;
}

/// Escapes the code into a `highlight` block without colouring it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, code: &str) -> String {
        format!(
            "<div class=\"highlight\"><pre>{}</pre></div>\n",
            html_escape::encode_text(code)
        )
    }
}

/// Runs the body of a `:python` filter and returns what it printed.
///
/// Implementations must leave the process's output stream as they found
/// it, whether or not the code raised.
pub trait CodeExecutor {
    fn execute(&self, code: &str) -> Result<String, String>;
}

pub(crate) fn render(
    node: &Node,
    filter: &Filter,
    highlighter: &dyn Highlighter,
    executor: Option<&dyn CodeExecutor>,
) -> Result<String, HamlError> {
    let lines = &filter.lines;
    let opening = "\n".repeat(node.trailing_blank_lines + 1);
    let output = match filter.kind {
        FilterKind::Plain => format!("{}{}", "\n".repeat(node.trailing_blank_lines), dedented(lines)),
        FilterKind::Javascript => format!(
            "<script type='text/javascript'>\n// <![CDATA[{}{}// ]]>\n</script>\n",
            opening,
            reindented(lines)
        ),
        FilterKind::CoffeeScript => format!(
            "<script type='text/coffeescript'>\n#<![CDATA[{}{}#]]>\n</script>\n",
            opening,
            verbatim(lines)
        ),
        FilterKind::Css => format!(
            "<style type='text/css'>\n/*<![CDATA[*/{}{}/*]]>*/\n</style>\n",
            opening,
            reindented(lines)
        ),
        FilterKind::Stylus => format!(
            "<style type='text/stylus'>\n/*<![CDATA[*/{}{}/*]]>*/\n</style>\n",
            opening,
            dedented(lines)
        ),
        FilterKind::CData => {
            let spaces = node.leading_space();
            format!(
                "{}<![CDATA[{}{}{}]]>\n",
                spaces,
                opening,
                reindented(lines),
                spaces
            )
        }
        FilterKind::Python => execute(node, lines, executor)?,
        FilterKind::Highlight => format!(
            "{}{}",
            node.leading_space(),
            highlighter.highlight(&dedented(lines))
        ),
    };
    Ok(output)
}

fn execute(
    node: &Node,
    lines: &[RawLine],
    executor: Option<&dyn CodeExecutor>,
) -> Result<String, HamlError> {
    let executor = executor.ok_or(HamlError::ExecutionDisabled {
        line: node.line_no,
    })?;
    let code: String = lines.iter().map(|l| format!("{}\n", l.text)).collect();
    info!("executing :python filter at line {}", node.line_no);
    executor.execute(&code).map_err(|message| {
        warn!("python filter at line {} failed: {}", node.line_no, message);
        HamlError::Execution {
            line: node.line_no,
            message,
        }
    })
}

fn with_blank_lines(text: &str, line: &RawLine) -> String {
    format!("{}{}", text, "\n".repeat(line.trailing_blank_lines + 1))
}

/// Lines relative to the first line's indentation.
fn dedented(lines: &[RawLine]) -> String {
    let width = lines.first().map_or(0, |l| l.indentation);
    lines
        .iter()
        .map(|l| with_blank_lines(l.dedented(width), l))
        .collect()
}

/// Lines re-indented with their own indentation character.
fn reindented(lines: &[RawLine]) -> String {
    lines
        .iter()
        .map(|l| with_blank_lines(&format!("{}{}", l.leading_space(), l.text), l))
        .collect()
}

fn verbatim(lines: &[RawLine]) -> String {
    lines
        .iter()
        .map(|l| with_blank_lines(&l.raw_text, l))
        .collect()
}
