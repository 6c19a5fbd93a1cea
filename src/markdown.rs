//! Component E: the Markdown reconstructor.
//!
//! Folds the linear attribute-run stream over `note_text` in two passes:
//! Pass 1 coalesces adjacent runs with an identical formatting signature
//! into groups (without this, identical styling spanning many runs would
//! emit fragmented markup like `**a****re**`); Pass 2 walks the groups
//! left to right and emits Markdown, one paragraph rule or character-style
//! wrap per group. Never fails — worst case, a malformed run stream yields
//! plain, unstyled text.

use crate::decode::{AttributeRun, Note};

const PARAGRAPH_SEPARATOR: &str = "\n\n---\n\n";

/// Identity of a checklist attribute: `None` if the run has no checklist at
/// all, `Some(None)` if it has one with no uuid, `Some(Some(uuid))` if it
/// has one with a uuid. Kept distinct from "no checklist" so two runs are
/// never silently merged across that boundary.
type ChecklistKey = Option<Option<Vec<u8>>>;

#[derive(Clone, PartialEq, Eq, Default)]
struct ParagraphSignature {
    checklist: ChecklistKey,
    style_type: Option<i32>,
    block_quote: Option<i32>,
    /// Two list items at different indent levels are visibly different
    /// paragraphs, so indent is part of the grouping signature even though
    /// it has no bearing on which character styling applies.
    indent_amount: Option<i32>,
}

#[derive(Clone, PartialEq, Eq, Default)]
struct CharSignature {
    font_weight: Option<i32>,
    emphasis_style: Option<i32>,
    underlined: Option<i32>,
    strikethrough: Option<i32>,
    superscript: Option<i32>,
    link: Option<String>,
}

#[derive(Clone, PartialEq, Default)]
struct Signature {
    paragraph: Option<ParagraphSignature>,
    chars: CharSignature,
}

struct Group {
    signature: Signature,
    text: String,
    /// Last-observed `done` value among this group's runs, for the
    /// Checklist emission rule. Meaningless when `signature.paragraph` has
    /// no checklist.
    checklist_done: bool,
}

fn signature_of(run: &AttributeRun) -> Signature {
    let paragraph = run.paragraph_style.as_ref().map(|ps| ParagraphSignature {
        checklist: ps.checklist.as_ref().map(|cl| cl.uuid.clone()),
        style_type: ps.style_type,
        block_quote: ps.block_quote,
        indent_amount: ps.indent_amount,
    });
    Signature {
        paragraph,
        chars: CharSignature {
            font_weight: run.font_weight,
            emphasis_style: run.emphasis_style,
            underlined: run.underlined,
            strikethrough: run.strikethrough,
            superscript: run.superscript,
            link: run.link.clone(),
        },
    }
}

fn checklist_done_of(run: &AttributeRun) -> bool {
    run.paragraph_style
        .as_ref()
        .and_then(|ps| ps.checklist.as_ref())
        .and_then(|cl| cl.done)
        .map(|d| d != 0)
        .unwrap_or(false)
}

/// Pass 1: merge consecutive runs with equal signatures, clamping any run
/// whose cumulative end would exceed the text length instead of panicking.
/// A note with zero attribute runs is treated as one implicit plain-text
/// group spanning the whole body, so untouched notes still round-trip.
fn group_runs(note_text: &str, runs: &[AttributeRun]) -> Vec<Group> {
    let chars: Vec<char> = note_text.chars().collect();
    let total = chars.len();

    if runs.is_empty() {
        if total == 0 {
            return Vec::new();
        }
        return vec![Group {
            signature: Signature::default(),
            text: note_text.to_string(),
            checklist_done: false,
        }];
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut offset: usize = 0;

    for run in runs {
        let length = run.length.unwrap_or(0) as usize;
        let start = offset.min(total);
        let end = (offset + length).min(total);
        offset += length;

        let piece: String = chars[start..end].iter().collect();
        let sig = signature_of(run);
        let done = checklist_done_of(run);

        match groups.last_mut() {
            Some(last) if last.signature == sig => {
                last.text.push_str(&piece);
                if sig.paragraph.as_ref().map(|p| p.checklist.is_some()).unwrap_or(false) {
                    last.checklist_done = done;
                }
            }
            _ => groups.push(Group {
                signature: sig,
                text: piece,
                checklist_done: done,
            }),
        }
    }

    groups
}

fn starts_fresh(output: &str, text: &str) -> bool {
    output.is_empty() || output.ends_with('\n') || text.starts_with('\n')
}

/// Ensure `output` ends with a newline (or is empty) before a paragraph
/// emission begins, consuming a leading `\n` from `text` if that's what
/// supplied the separator, so we never double up blank lines.
fn begin_paragraph(output: &mut String, text: &str) -> String {
    if let Some(rest) = text.strip_prefix('\n') {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        rest.to_string()
    } else {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        text.to_string()
    }
}

fn list_prefix(style_type: i32) -> &'static str {
    match style_type {
        100 => "- ",
        101 => "* ",
        102 => "1. ",
        103 => "- ",
        200 => "1. ",
        201 => "1) ",
        202 => "a. ",
        203 => "i. ",
        _ => "- ",
    }
}

fn emit_list(output: &mut String, text: &str, style_type: i32, indent_amount: i32) {
    let text = begin_paragraph(output, text);
    let indent_prefix = "  ".repeat(indent_amount.max(0) as usize);
    let prefix = list_prefix(style_type);

    let lines: Vec<&str> = text.split('\n').collect();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        if line.is_empty() {
            continue;
        }
        output.push_str(&indent_prefix);
        output.push_str(prefix);
        output.push_str(line);
    }
}

/// Split off one trailing `\n` (if present) so single-shot paragraph
/// emissions (checklist, heading, quote, code) can wrap just the content
/// and re-attach the line separator afterward.
fn split_trailing_newline(text: &str) -> (&str, bool) {
    match text.strip_suffix('\n') {
        Some(core) => (core, true),
        None => (text, false),
    }
}

fn emit_checklist(output: &mut String, text: &str, done: bool) {
    let text = begin_paragraph(output, text);
    let (core, had_newline) = split_trailing_newline(&text);
    output.push_str(if done { "- [x] " } else { "- [ ] " });
    output.push_str(core);
    if had_newline {
        output.push('\n');
    }
}

fn emit_heading(output: &mut String, text: &str, style_type: i32) {
    let text = begin_paragraph(output, text);
    let (core, had_newline) = split_trailing_newline(&text);
    let marker = match style_type {
        0 => "# ",
        1 => "## ",
        _ => "### ",
    };
    output.push_str(marker);
    output.push_str(core);
    if had_newline {
        output.push('\n');
    }
}

fn emit_block_quote(output: &mut String, text: &str) {
    let text = begin_paragraph(output, text);
    let (core, had_newline) = split_trailing_newline(&text);
    output.push_str("> ");
    output.push_str(core);
    if had_newline {
        output.push('\n');
    }
}

fn emit_code(output: &mut String, text: &str) {
    let text = begin_paragraph(output, text);
    let (core, had_newline) = split_trailing_newline(&text);
    if core.contains('\n') {
        output.push_str("```\n");
        output.push_str(core);
        output.push_str("\n```");
    } else {
        output.push('`');
        output.push_str(core);
        output.push('`');
    }
    if had_newline {
        output.push('\n');
    }
}

/// A group is "stylable" only if it has at least one non-punctuation,
/// non-whitespace character; otherwise wrapping it would just fragment
/// markup around spaces and commas.
fn is_stylable(text: &str) -> bool {
    text.chars().any(|c| !c.is_whitespace() && !c.is_ascii_punctuation())
}

fn apply_char_styling(text: &str, chars: &CharSignature) -> String {
    if text.trim().is_empty() || !is_stylable(text) {
        return text.to_string();
    }

    let mut body = text.to_string();
    if let Some(link) = &chars.link {
        body = format!("[{body}]({link})");
    }
    if chars.font_weight.unwrap_or(0) > 0 {
        body = format!("**{body}**");
    }
    if chars.emphasis_style.unwrap_or(0) > 0 {
        body = format!("*{body}*");
    }
    if chars.strikethrough.unwrap_or(0) > 0 {
        body = format!("~~{body}~~");
    }
    if chars.underlined.unwrap_or(0) > 0 {
        body = format!("<u>{body}</u>");
    }
    match chars.superscript.unwrap_or(0) {
        n if n > 0 => body = format!("<sup>{body}</sup>"),
        n if n < 0 => body = format!("<sub>{body}</sub>"),
        _ => {}
    }
    body
}

fn emit_group(output: &mut String, group: &Group) {
    let fresh = starts_fresh(output, &group.text);

    if let Some(paragraph) = &group.signature.paragraph {
        if paragraph.checklist.is_some() && fresh && !group.text.trim().is_empty() {
            emit_checklist(output, &group.text, group.checklist_done);
            return;
        }
        if matches!(paragraph.style_type, Some(0) | Some(1) | Some(2)) && fresh {
            emit_heading(output, &group.text, paragraph.style_type.unwrap());
            return;
        }
        if paragraph.style_type == Some(4) {
            emit_code(output, &group.text);
            return;
        }
        if let Some(style_type) = paragraph.style_type {
            if matches!(style_type, 100..=103 | 200..=203) || style_type > 50 {
                emit_list(output, &group.text, style_type, paragraph.indent_amount.unwrap_or(0));
                return;
            }
        }
        if paragraph.block_quote.unwrap_or(0) > 0 && fresh {
            emit_block_quote(output, &group.text);
            return;
        }
    }

    output.push_str(&apply_char_styling(&group.text, &group.signature.chars));
}

/// Reconstruct Markdown for one note's text + attribute runs. Does not
/// prepend a title; see [`to_markdown`] for that.
pub fn reconstruct_body(note: &Note) -> String {
    let text = note.note_text.as_deref().unwrap_or("");
    let groups = group_runs(text, &note.attribute_run);
    let mut output = String::new();
    for group in &groups {
        emit_group(&mut output, group);
    }
    output
}

/// Reconstruct full Markdown for a note, prepending `# <title>\n\n` unless
/// the body already begins with a heading.
pub fn to_markdown(note: &Note, title: &str) -> String {
    let body = reconstruct_body(note);
    if body.starts_with('#') {
        body
    } else {
        format!("# {title}\n\n{body}")
    }
}

/// Join multiple already-rendered note bodies with the multi-note
/// separator.
pub fn join_notes<I: IntoIterator<Item = String>>(bodies: I) -> String {
    bodies.into_iter().collect::<Vec<_>>().join(PARAGRAPH_SEPARATOR)
}
