//! Logical line reader and classifier.
//!
//! Joins backslash-continued physical lines into logical lines and sorts
//! each into one of the shapes the checkers know about: assignments,
//! directives, includes, shell commands, dependency lines and comments.

use mklint_types::line::{Line, RawLine};
use mklint_types::SourceFile;

use crate::lexer::parse_varref;

// ══════════════════════════════════════════════════════════════════════════════
// Line shapes
// ══════════════════════════════════════════════════════════════════════════════

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `=`
    Plain,
    /// `+=`
    Append,
    /// `?=`
    Default,
    /// `:=`, evaluated while the file is loaded.
    Eval,
    /// `!=`, a shell command run while the file is loaded.
    Shell,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "=",
            Self::Append => "+=",
            Self::Default => "?=",
            Self::Eval => ":=",
            Self::Shell => "!=",
        }
    }

    /// Whether the right-hand side is evaluated at load time.
    pub fn evaluates_at_load_time(self) -> bool {
        matches!(self, Self::Eval | Self::Shell)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub varname: String,
    /// The parameterized form, e.g. `PKG_OPTIONS.*` for `PKG_OPTIONS.foo`.
    pub varcanon: String,
    pub op: AssignOp,
    pub value: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Number of spaces between the `.` and the directive name.
    pub indent: usize,
    pub name: String,
    pub args: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub directive: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Empty,
    Comment,
    Assignment(Assignment),
    Directive(Directive),
    Include(Include),
    ShellCommand { text: String },
    Dependency { targets: String, sources: String },
    Unknown,
}

/// One logical line with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkLine {
    pub line: Line,
    /// The joined text of all physical lines.
    pub text: String,
    pub kind: LineKind,
}

/// All logical lines of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkLines {
    pub filename: String,
    pub lines: Vec<MkLine>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Reading
// ══════════════════════════════════════════════════════════════════════════════

impl MkLines {
    /// Split and classify the text of one file.
    pub fn parse(filename: impl Into<String>, text: &str) -> Self {
        let filename = filename.into();
        let source = SourceFile::new(filename.clone(), text);
        let mut lines = Vec::new();
        let mut pending: Vec<RawLine> = Vec::new();

        for (lineno, text) in source.lines() {
            pending.push(RawLine::new(lineno, text).with_eol(source.terminator(lineno)));
            if !is_continued(text) {
                lines.push(MkLine::new(Line::new(&filename, std::mem::take(&mut pending))));
            }
        }
        if !pending.is_empty() {
            lines.push(MkLine::new(Line::new(&filename, pending)));
        }

        Self { filename, lines }
    }

    /// The current text of the whole file, including autofix changes.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for mkline in &self.lines {
            mkline.line.write_to(&mut out);
        }
        out
    }

    pub fn is_changed(&self) -> bool {
        self.lines.iter().any(|l| l.line.is_changed())
    }
}

impl MkLine {
    pub fn new(line: Line) -> Self {
        let text = join_continuation(&line.raw);
        let kind = classify(&text);
        Self { line, text, kind }
    }

    pub fn lineno(&self) -> u32 {
        self.line.location.first
    }
}

fn is_continued(text: &str) -> bool {
    let trailing = text.bytes().rev().take_while(|&b| b == b'\\').count();
    trailing % 2 == 1
}

fn join_continuation(raw: &[RawLine]) -> String {
    let mut joined = String::new();
    for (i, r) in raw.iter().enumerate() {
        let mut part = r.orig.as_str();
        if i > 0 {
            part = part.trim_start();
        }
        if i + 1 < raw.len() {
            part = part.strip_suffix('\\').unwrap_or(part).trim_end();
            joined.push_str(part);
            joined.push(' ');
        } else {
            joined.push_str(part);
        }
    }
    joined
}

// ══════════════════════════════════════════════════════════════════════════════
// Classification
// ══════════════════════════════════════════════════════════════════════════════

const INCLUDE_DIRECTIVES: &[&str] = &["include", "sinclude", "-include", "dinclude"];

fn classify(text: &str) -> LineKind {
    if text.trim().is_empty() {
        return LineKind::Empty;
    }
    if let Some(command) = text.strip_prefix('\t') {
        return LineKind::ShellCommand {
            text: command.to_string(),
        };
    }
    if text.trim_start().starts_with('#') {
        return LineKind::Comment;
    }
    if let Some(rest) = text.strip_prefix('.') {
        return classify_directive(rest);
    }
    classify_assignment_or_dependency(text)
}

fn classify_directive(rest: &str) -> LineKind {
    let indent = rest.len() - rest.trim_start_matches(' ').len();
    let rest = &rest[indent..];
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let name = &rest[..name_len];
    if name.is_empty() {
        return LineKind::Unknown;
    }
    let (args, comment) = split_comment(&rest[name_len..]);

    if INCLUDE_DIRECTIVES.contains(&name) {
        let path = args
            .trim()
            .trim_matches(|c| c == '"' || c == '<' || c == '>')
            .to_string();
        return LineKind::Include(Include {
            directive: name.to_string(),
            path,
        });
    }

    LineKind::Directive(Directive {
        indent,
        name: name.to_string(),
        args: args.trim().to_string(),
        comment,
    })
}

fn classify_assignment_or_dependency(text: &str) -> LineKind {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' => match parse_varref(&text[i..]) {
                Some((_, len)) => i += len,
                None => return LineKind::Unknown,
            },
            b' ' | b'\t' | b'=' | b':' | b'!' | b'?' | b'+' => break,
            _ => i += text[i..].chars().next().map_or(1, char::len_utf8),
        }
    }
    let varname = &text[..i];
    let after = text[i..].trim_start();

    let (op, op_len) = if after.starts_with("+=") {
        (AssignOp::Append, 2)
    } else if after.starts_with("?=") {
        (AssignOp::Default, 2)
    } else if after.starts_with(":=") {
        (AssignOp::Eval, 2)
    } else if after.starts_with("!=") {
        (AssignOp::Shell, 2)
    } else if after.starts_with('=') {
        (AssignOp::Plain, 1)
    } else if let Some(sources) = after.strip_prefix(':') {
        let (sources, _) = split_comment(sources);
        return LineKind::Dependency {
            targets: text[..i].trim().to_string(),
            sources: sources.trim().to_string(),
        };
    } else {
        return LineKind::Unknown;
    };

    if varname.is_empty() {
        return LineKind::Unknown;
    }
    let (value, comment) = split_comment(&after[op_len..]);
    LineKind::Assignment(Assignment {
        varname: varname.to_string(),
        varcanon: varname_canon(varname),
        op,
        value: value.trim().to_string(),
        comment,
    })
}

/// Split at the first unescaped `#`.
fn split_comment(text: &str) -> (&str, Option<String>) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'#' => return (&text[..i], Some(text[i..].to_string())),
            _ => i += 1,
        }
    }
    (text, None)
}

/// The parameterized form of a variable name: `VAR.param` becomes `VAR.*`.
pub fn varname_canon(varname: &str) -> String {
    match varname.find('.') {
        Some(dot) if dot > 0 => format!("{}.*", &varname[..dot]),
        _ => varname.to_string(),
    }
}
