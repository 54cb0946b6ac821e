//! Comment-aware, string-safe cleaning of Go source text.
//!
//! The sanitizer works line by line. A small lexer state is threaded through
//! the lines: block comments and raw (backtick) strings may span lines, while
//! interpreted strings and rune literals are tracked only within one line.
//! Each line is split into code and comment segments, comments are classified
//! as important or not, and the kept segments are re-assembled.
//!
//! Literal contents are never modified. Lines that begin inside a raw string
//! keep their leading whitespace, lines that end inside one keep their
//! trailing whitespace, and blank lines inside a raw string are kept as is.

use crate::config::ScanPolicy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ops::Range;

/// Widest indentation kept by whitespace compaction, in columns
const MAX_INDENT_WIDTH: usize = 16;

/// Columns a tab counts for when measuring and re-encoding indentation
const TAB_WIDTH: usize = 4;

const DEFAULT_KEYWORDS: &[&str] = &[
    "//go:",
    "//go:generate",
    "//go:build",
    "//go:embed",
    "+build",
    "package ",
    "copyright",
    "license",
    "author",
    "todo",
    "fixme",
    "note",
    "warning",
    "deprecated",
    "bug",
    "hack",
    "important",
    "security",
    "performance",
    "api",
    "public",
    "exported",
    "interface",
];

const DEFAULT_DECLARATION_MARKERS: &[&str] = &["func ", "type ", "var ", "const "];

/// Rules deciding which comments survive comment stripping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceRules {
    /// Substrings that mark a comment as important (case-insensitive)
    pub keywords: Vec<String>,
    /// Declaration keywords that, inside a `// ` comment, mark it as
    /// documentation of a declaration
    pub declaration_markers: Vec<String>,
}

impl Default for ImportanceRules {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            declaration_markers: DEFAULT_DECLARATION_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ImportanceRules {
    /// Check whether a comment (including its `//` or `/*` marker) is important
    pub fn is_important(&self, comment: &str) -> bool {
        self.lowercased().matches(&comment.to_lowercase())
    }

    fn lowercased(&self) -> Self {
        Self {
            keywords: self.keywords.iter().map(|k| k.to_lowercase()).collect(),
            declaration_markers: self
                .declaration_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
        }
    }

    /// Both the rules and `lower` must already be lowercase
    fn matches(&self, lower: &str) -> bool {
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            return true;
        }

        lower.trim_start().starts_with("// ")
            && self
                .declaration_markers
                .iter()
                .any(|m| lower.contains(m.as_str()))
    }
}

/// Context carried from the end of one line to the start of the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Carry {
    #[default]
    Code,
    BlockComment(usize),
    RawString,
}

/// Context while walking the bytes of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Interpreted { escaped: bool },
    Rune { escaped: bool },
    RawString,
    BlockComment(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Code,
    /// Index into the lexer's comment table
    Comment(usize),
}

#[derive(Debug, Clone)]
struct Segment {
    piece: Piece,
    range: Range<usize>,
}

#[derive(Debug)]
struct ScannedLine<'a> {
    text: &'a str,
    segments: Vec<Segment>,
    starts_in_raw: bool,
    ends_in_raw: bool,
}

impl ScannedLine<'_> {
    fn has_comment(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s.piece, Piece::Comment(_)))
    }
}

/// Splits lines into code and comment segments.
///
/// Every comment gets an id; the full text of each comment (all lines of a
/// block comment) is collected so importance is decided per comment.
#[derive(Debug, Default)]
struct Lexer {
    carry: Carry,
    comments: Vec<String>,
}

impl Lexer {
    fn open_comment(&mut self) -> usize {
        self.comments.push(String::new());
        self.comments.len() - 1
    }

    fn scan_line<'a>(&mut self, text: &'a str) -> ScannedLine<'a> {
        // Every delimiter is ASCII, so byte offsets found here are always
        // char boundaries.
        let bytes = text.as_bytes();
        let starts_in_raw = self.carry == Carry::RawString;
        let mut mode = match self.carry {
            Carry::Code => Mode::Code,
            Carry::BlockComment(id) => Mode::BlockComment(id),
            Carry::RawString => Mode::RawString,
        };
        let mut segments = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            let next = bytes.get(i + 1).copied();

            match mode {
                Mode::Code => match (b, next) {
                    (b'"', _) => mode = Mode::Interpreted { escaped: false },
                    (b'\'', _) => mode = Mode::Rune { escaped: false },
                    (b'`', _) => mode = Mode::RawString,
                    (b'/', Some(b'/')) => {
                        push_code(&mut segments, start..i);
                        let id = self.open_comment();
                        self.comments[id].push_str(&text[i..]);
                        segments.push(Segment {
                            piece: Piece::Comment(id),
                            range: i..bytes.len(),
                        });
                        start = bytes.len();
                        break;
                    }
                    (b'/', Some(b'*')) => {
                        push_code(&mut segments, start..i);
                        mode = Mode::BlockComment(self.open_comment());
                        start = i;
                        i += 2;
                        continue;
                    }
                    _ => {}
                },
                Mode::Interpreted { escaped } => {
                    mode = match b {
                        _ if escaped => Mode::Interpreted { escaped: false },
                        b'\\' => Mode::Interpreted { escaped: true },
                        b'"' => Mode::Code,
                        _ => mode,
                    }
                }
                Mode::Rune { escaped } => {
                    mode = match b {
                        _ if escaped => Mode::Rune { escaped: false },
                        b'\\' => Mode::Rune { escaped: true },
                        b'\'' => Mode::Code,
                        _ => mode,
                    }
                }
                Mode::RawString => {
                    if b == b'`' {
                        mode = Mode::Code;
                    }
                }
                Mode::BlockComment(id) => {
                    if b == b'*' && next == Some(b'/') {
                        i += 2;
                        self.comments[id].push_str(&text[start..i]);
                        segments.push(Segment {
                            piece: Piece::Comment(id),
                            range: start..i,
                        });
                        start = i;
                        mode = Mode::Code;
                        continue;
                    }
                }
            }
            i += 1;
        }

        self.carry = match mode {
            Mode::BlockComment(id) => {
                // Kept even when empty: the line still lies inside the comment.
                self.comments[id].push_str(&text[start..]);
                self.comments[id].push('\n');
                segments.push(Segment {
                    piece: Piece::Comment(id),
                    range: start..bytes.len(),
                });
                Carry::BlockComment(id)
            }
            Mode::RawString => {
                push_code(&mut segments, start..bytes.len());
                Carry::RawString
            }
            // Interpreted strings and runes never continue on the next line.
            _ => {
                push_code(&mut segments, start..bytes.len());
                Carry::Code
            }
        };

        ScannedLine {
            text,
            segments,
            starts_in_raw,
            ends_in_raw: self.carry == Carry::RawString,
        }
    }
}

fn push_code(segments: &mut Vec<Segment>, range: Range<usize>) {
    if !range.is_empty() {
        segments.push(Segment {
            piece: Piece::Code,
            range,
        });
    }
}

#[derive(Debug, Clone, Copy)]
struct CommentFlags {
    important: bool,
    /// Block comment spanning more than one line
    multiline: bool,
}

#[derive(Debug)]
struct OutputLine {
    text: String,
    /// Raw-string content that must survive trailing blank-line trimming
    protected: bool,
}

/// Cleans source text according to a policy and a set of importance rules
#[derive(Debug, Clone)]
pub struct Sanitizer {
    policy: ScanPolicy,
    rules: ImportanceRules,
}

impl Sanitizer {
    pub fn new(policy: ScanPolicy, rules: ImportanceRules) -> Self {
        Self {
            policy,
            rules: rules.lowercased(),
        }
    }

    /// Strip comments and compact whitespace as the policy asks.
    ///
    /// With both stripping and compaction disabled the input is returned
    /// unchanged.
    pub fn sanitize(&self, raw: &str) -> String {
        if !self.policy.rewrites_text() {
            return raw.to_string();
        }

        let mut lexer = Lexer::default();
        let lines: Vec<ScannedLine> = raw.split('\n').map(|l| lexer.scan_line(l)).collect();
        let comments: Vec<CommentFlags> = lexer
            .comments
            .iter()
            .map(|c| CommentFlags {
                important: self.rules.matches(&c.to_lowercase()),
                multiline: c.contains('\n'),
            })
            .collect();

        let compact = self.policy.compact_whitespace;
        let mut out: Vec<OutputLine> = Vec::with_capacity(lines.len());
        let mut last_blank = false;

        for line in &lines {
            let Some(body) = self.strip_line(line, &comments) else {
                continue;
            };

            if !line.starts_in_raw && body.trim().is_empty() {
                if compact {
                    if last_blank {
                        continue;
                    }
                    out.push(OutputLine {
                        text: String::new(),
                        protected: false,
                    });
                } else {
                    out.push(OutputLine {
                        text: body.into_owned(),
                        protected: false,
                    });
                }
                last_blank = true;
                continue;
            }

            let text = if compact {
                compact_line(&body, line.starts_in_raw, line.ends_in_raw)
            } else {
                body.into_owned()
            };
            out.push(OutputLine {
                text,
                protected: line.starts_in_raw,
            });
            last_blank = false;
        }

        while out
            .last()
            .is_some_and(|l| !l.protected && l.text.trim().is_empty())
        {
            out.pop();
        }

        out.into_iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Remove non-important comments from one line.
    ///
    /// A line holding an important comment keeps every comment that lies
    /// entirely on it; only unimportant block comments continuing from or
    /// onto other lines are still removed, since those lines are dropped.
    /// Returns `None` when the line held nothing but removed comments.
    fn strip_line<'a>(&self, line: &ScannedLine<'a>, comments: &[CommentFlags]) -> Option<Cow<'a, str>> {
        if !self.policy.strip_comments || !line.has_comment() {
            return Some(Cow::Borrowed(line.text));
        }

        let keeps_important = line
            .segments
            .iter()
            .any(|s| matches!(s.piece, Piece::Comment(id) if comments[id].important));
        let drops = |id: usize| {
            let flags = comments[id];
            !flags.important && (!keeps_important || flags.multiline)
        };

        let drops_any = line
            .segments
            .iter()
            .any(|s| matches!(s.piece, Piece::Comment(id) if drops(id)));
        if !drops_any {
            return Some(Cow::Borrowed(line.text));
        }

        let mut kept = String::with_capacity(line.text.len());
        let mut after_comment = false;
        for segment in &line.segments {
            if let Piece::Comment(id) = segment.piece {
                if drops(id) {
                    after_comment = true;
                    continue;
                }
            }

            let mut text = &line.text[segment.range.clone()];
            if after_comment {
                if kept.is_empty() || kept.ends_with(char::is_whitespace) {
                    text = text.trim_start();
                } else if needs_separator(kept.chars().last(), text.chars().next()) {
                    // Keep the tokens on both sides of the comment apart.
                    kept.push(' ');
                }
            }
            kept.push_str(text);
            after_comment = false;
        }

        if !line.ends_in_raw {
            kept.truncate(kept.trim_end().len());
        }

        if kept.trim().is_empty() {
            None
        } else {
            Some(Cow::Owned(kept))
        }
    }
}

/// Whether joining `left` and `right` directly would merge two tokens
fn needs_separator(left: Option<char>, right: Option<char>) -> bool {
    let (Some(a), Some(b)) = (left, right) else {
        return false;
    };
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let is_operator = |c: char| c.is_ascii_punctuation() && !"()[]{},;".contains(c);

    (is_word(a) && is_word(b)) || (is_operator(a) && is_operator(b))
}

/// Clean `raw` with the default importance rules
pub fn sanitize(raw: &str, policy: &ScanPolicy) -> String {
    Sanitizer::new(*policy, ImportanceRules::default()).sanitize(raw)
}

/// Re-encode the leading indentation as tabs then spaces, capped at
/// `MAX_INDENT_WIDTH` columns, and drop trailing whitespace.
fn compact_line(line: &str, starts_in_raw: bool, ends_in_raw: bool) -> String {
    let (indent, content) = if starts_in_raw {
        (String::new(), line)
    } else {
        let content = line.trim_start_matches(|c: char| c == ' ' || c == '\t');
        let width: usize = line[..line.len() - content.len()]
            .chars()
            .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
            .sum();
        (encode_indent(width.min(MAX_INDENT_WIDTH)), content)
    };

    let content = if ends_in_raw {
        content
    } else {
        content.trim_end()
    };

    format!("{indent}{content}")
}

fn encode_indent(width: usize) -> String {
    let mut indent = "\t".repeat(width / TAB_WIDTH);
    indent.push_str(&" ".repeat(width % TAB_WIDTH));
    indent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> ScanPolicy {
        ScanPolicy::default()
    }

    fn strip_only() -> ScanPolicy {
        ScanPolicy {
            compact_whitespace: false,
            ..ScanPolicy::default()
        }
    }

    fn compact_only() -> ScanPolicy {
        ScanPolicy {
            strip_comments: false,
            ..ScanPolicy::default()
        }
    }

    #[test]
    fn test_verbatim_policy_returns_input() {
        let raw = "package main\n\n\n// chatter\n    x := 1   \n";
        assert_eq!(sanitize(raw, &ScanPolicy::verbatim()), raw);
    }

    #[test]
    fn test_important_comment_retained() {
        let out = sanitize("// TODO: fix\nfunc main() {}\n", &full());
        assert_eq!(out, "// TODO: fix\nfunc main() {}");
    }

    #[test]
    fn test_copyright_survives_and_chatter_is_removed() {
        let raw = "// Copyright 2024\npackage main\n\n// just chatting\nvar x = 1\n";
        assert_eq!(
            sanitize(raw, &full()),
            "// Copyright 2024\npackage main\n\nvar x = 1"
        );
    }

    #[test]
    fn test_trailing_comment_removed_code_kept() {
        let raw = "x := compute()   // just chatting\n";
        assert_eq!(sanitize(raw, &strip_only()), "x := compute()");
        assert_eq!(sanitize(raw, &full()), "x := compute()");
    }

    #[test]
    fn test_literals_are_preserved() {
        let cases = [
            (
                "s := \"http://example.com\" // trailing chatter",
                "s := \"http://example.com\"",
            ),
            ("p := \"/* not a comment */\"", "p := \"/* not a comment */\""),
            ("s := \"a \\\" // b\" // c", "s := \"a \\\" // b\""),
            ("c := '\"' // quote char", "c := '\"'"),
            ("r := '\\'' // apostrophe", "r := '\\''"),
            ("u := `//raw` + \"/*\" // end", "u := `//raw` + \"/*\""),
        ];

        for (input, expected) in cases {
            assert_eq!(sanitize(input, &full()), expected, "input: {input}");
        }
    }

    #[test]
    fn test_multiline_raw_string_untouched() {
        let raw = "q := `first // keep\n        /* inner */   \n\n\n`\n";
        let expected = "q := `first // keep\n        /* inner */   \n\n\n`";

        assert_eq!(sanitize(raw, &full()), expected);
        assert_eq!(sanitize(raw, &strip_only()), expected);
    }

    #[test]
    fn test_comment_after_raw_string_closes() {
        let raw = "q := `a\nb` // chatter\nnext()\n";
        assert_eq!(sanitize(raw, &full()), "q := `a\nb`\nnext()");
    }

    #[test]
    fn test_inline_block_comment_removed() {
        let cases = [
            ("x := 1 /* one */ + 2", "x := 1 + 2"),
            ("a := b/*x*/c", "a := b c"),
            ("call(/* arg */)", "call()"),
            ("/* lead */ run()", "run()"),
            ("/* chatter\nend */ x := 1 // TODO keep\n", "x := 1 // TODO keep"),
            ("y := 1 /* TODO */ /* chatter\nmore */\nz := 2\n", "y := 1 /* TODO */\nz := 2"),
            ("/* chatter */ x := 1 // TODO keep", "/* chatter */ x := 1 // TODO keep"),
        ];

        for (input, expected) in cases {
            assert_eq!(sanitize(input, &full()), expected, "input: {input}");
        }
    }

    #[test]
    fn test_multiline_block_comment_removed() {
        let raw = "/*\n helper block\n\n spans lines\n*/\nfunc run() {}\n";
        assert_eq!(sanitize(raw, &full()), "func run() {}");
    }

    #[test]
    fn test_block_comment_around_code() {
        let raw = "x := 1 /* starts\nstill going */ y := 2\n";
        assert_eq!(sanitize(raw, &strip_only()), "x := 1\ny := 2");
    }

    #[test]
    fn test_important_block_kept_whole() {
        let raw = "/*\nCopyright 2024 Acme\nall rights\n*/\npackage main\n";
        assert_eq!(
            sanitize(raw, &full()),
            "/*\nCopyright 2024 Acme\nall rights\n*/\npackage main"
        );
    }

    #[test]
    fn test_blank_line_cap() {
        let cases = [
            "a\n\n\n\nb\n\n\n",
            "a\n\n// chatter\n\nb",
            "\n\n\na\n  \n\t\n\nb",
            "a\n\n/* gone */\n\n\n/* also\ngone */\n\nb\n",
        ];

        for input in cases {
            let out = sanitize(input, &full());
            assert!(!out.contains("\n\n\n"), "input: {input:?} output: {out:?}");
            assert!(out.ends_with('b'), "output: {out:?}");
        }
        assert_eq!(sanitize("a\n\n\n\nb\n\n\n", &full()), "a\n\nb");
    }

    #[test]
    fn test_blank_lines_pass_without_compaction() {
        assert_eq!(sanitize("a\n\n\n\nb\n", &strip_only()), "a\n\n\n\nb");
    }

    #[test]
    fn test_indentation_compaction() {
        let cases = [
            ("        x", "\t\tx"),
            ("\t\t\t\t\t\tx", "\t\t\t\tx"),
            ("      y", "\t  y"),
            ("\t  z", "\t  z"),
            ("  w   ", "  w"),
            ("v", "v"),
        ];

        for (input, expected) in cases {
            assert_eq!(sanitize(input, &compact_only()), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_compaction_keeps_comments_when_not_stripping() {
        let raw = "func f() {\n        // chatter\n}\n";
        assert_eq!(sanitize(raw, &compact_only()), "func f() {\n\t\t// chatter\n}");
    }

    #[test]
    fn test_idempotent_without_comments() {
        let cases = [
            "package main\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n",
            "x\n\n\n\n      y   \n\t\t\t\t\t\tz\n\n",
            "s := `a\n   b\n\n\n`\n",
            "a := \"//\"\r\nb := 1\r\n",
        ];

        for input in cases {
            let once = sanitize(input, &full());
            assert_eq!(sanitize(&once, &full()), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_importance_classifier() {
        let rules = ImportanceRules::default();
        let cases = [
            ("//go:generate stringer -type=Kind", true),
            ("// +build linux", true),
            ("// Copyright 2024", true),
            ("// TODO: fix", true),
            ("/* DEPRECATED: use New */", true),
            ("// Security check", true),
            ("// func helper does the work", true),
            ("// type alias for ids", true),
            ("//func without space", false),
            ("// just chatting", false),
            ("// increments the counter", false),
        ];

        for (comment, expected) in cases {
            assert_eq!(rules.is_important(comment), expected, "comment: {comment}");
        }
    }

    #[test]
    fn test_custom_rules() {
        let rules = ImportanceRules {
            keywords: vec!["KEEP".to_string()],
            declaration_markers: vec![],
        };
        let sanitizer = Sanitizer::new(strip_only(), rules);

        let out = sanitizer.sanitize("a() // keep me\nb() // TODO later\n");
        assert_eq!(out, "a() // keep me\nb()");
    }
}
