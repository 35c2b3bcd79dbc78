//! Parser for outline text → mind map.
//!
//! Built on `winnow` 0.7. Each non-blank, non-comment line is one item:
//! two-space indentation per level, a `- ` bullet, an optional `[ ]`/`[x]`
//! completion marker, the title, and an optional trailing `#token` color
//! tag. Exactly one top-level item is allowed; it becomes the root.
//! Imported maps are auto-arranged so every node gets a real position.

use crate::emitter::is_tag_char;
use crate::id::NodeId;
use crate::layout::{LayoutConfig, arrange};
use crate::model::{Canvas, ColorTag};
use crate::tree::TreeModel;
use winnow::ascii::space0;
use winnow::combinator::{alt, delimited, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("outline has no items")]
    Empty,
}

/// Parse outline text into an auto-arranged tree.
pub fn parse_outline(input: &str, canvas: Canvas) -> Result<TreeModel, ParseError> {
    parse_outline_with(input, canvas, &LayoutConfig::default())
}

/// As `parse_outline`, with an explicit layout policy.
pub fn parse_outline_with(
    input: &str,
    canvas: Canvas,
    config: &LayoutConfig,
) -> Result<TreeModel, ParseError> {
    let mut tree = TreeModel::new(canvas);
    // (level, node) chain from the root to the most recent item.
    let mut chain: Vec<(usize, NodeId)> = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut rest = raw;
        let item = parse_item.parse_next(&mut rest).map_err(|_| ParseError::Syntax {
            line,
            message: "expected a `- ` list item".into(),
        })?;

        if item.indent % 2 != 0 {
            return Err(syntax(line, "indentation must be a multiple of two spaces"));
        }
        let level = item.indent / 2;

        let id = if chain.is_empty() {
            if level != 0 {
                return Err(syntax(line, "the first item must not be indented"));
            }
            tree.ensure_root()
        } else {
            if level == 0 {
                return Err(syntax(line, "only one top-level item is allowed"));
            }
            while chain.last().is_some_and(|(l, _)| *l >= level) {
                chain.pop();
            }
            let Some(&(parent_level, parent)) = chain.last() else {
                return Err(syntax(line, "item has no parent"));
            };
            if level > parent_level + 1 {
                return Err(syntax(line, "item is indented more than one level"));
            }
            tree.add_child(parent)
                .ok_or_else(|| syntax(line, "item has no parent"))?
        };

        tree.set_title(id, item.title);
        tree.set_completed(id, item.completed);
        if let Some(tag) = item.tag {
            tree.set_color(id, ColorTag::new(tag));
        }
        chain.push((level, id));
    }

    if tree.is_empty() {
        return Err(ParseError::Empty);
    }

    let arrangement = arrange(&tree, canvas, config);
    tree.apply_positions(arrangement.positions);
    Ok(tree)
}

fn syntax(line: usize, message: &str) -> ParseError {
    ParseError::Syntax {
        line,
        message: message.to_string(),
    }
}

// ─── Low-level parsers ──────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
struct Item<'a> {
    indent: usize,
    completed: bool,
    title: &'a str,
    tag: Option<&'a str>,
}

fn parse_item<'a>(input: &mut &'a str) -> ModalResult<Item<'a>> {
    let indent: &str = take_while(0.., ' ').parse_next(input)?;
    let _ = '-'.parse_next(input)?;
    let _ = space0.parse_next(input)?;
    let completed = opt(parse_marker).parse_next(input)?.unwrap_or(false);
    let _ = space0.parse_next(input)?;
    let text: &str = take_till(0.., |c: char| c == '\n' || c == '\r').parse_next(input)?;
    let (title, tag) = split_tag(text.trim_end());
    Ok(Item {
        indent: indent.len(),
        completed,
        title,
        tag,
    })
}

fn parse_marker(input: &mut &str) -> ModalResult<bool> {
    delimited(
        '[',
        alt((one_of(['x', 'X']).value(true), ' '.value(false))),
        ']',
    )
    .parse_next(input)
}

/// Split a trailing ` #token` off the title.
fn split_tag(text: &str) -> (&str, Option<&str>) {
    if let Some((head, token)) = text.rsplit_once('#')
        && !token.is_empty()
        && token.chars().all(is_tag_char)
        && (head.is_empty() || head.ends_with(char::is_whitespace))
    {
        return (head.trim_end(), Some(token));
    }
    (text, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::check_tree;
    use pretty_assertions::assert_eq;

    #[test]
    fn item_line_parts() {
        let mut input = "    - [x] Ship it #green";
        let item = parse_item(&mut input).unwrap();
        assert_eq!(
            item,
            Item {
                indent: 4,
                completed: true,
                title: "Ship it",
                tag: Some("green"),
            }
        );
    }

    #[test]
    fn marker_and_tag_are_optional() {
        let mut input = "- [draft] Issue #42 follow-up";
        let item = parse_item(&mut input).unwrap();
        assert!(!item.completed);
        assert_eq!(item.title, "[draft] Issue #42 follow-up");
        assert_eq!(item.tag, None);
    }

    #[test]
    fn builds_tree_in_order() {
        let input = "# goals\n- Root\n  - A\n    - A1\n  - [x] B #red\n";
        let tree = parse_outline(input, Canvas::default()).unwrap();
        let order: Vec<String> = tree
            .pre_order()
            .into_iter()
            .map(|id| tree.get(id).unwrap().title.clone())
            .collect();
        assert_eq!(order, vec!["Root", "A", "A1", "B"]);
        let b = tree.pre_order()[3];
        assert!(tree.get(b).unwrap().completed);
        assert_eq!(tree.get(b).unwrap().color_tag.as_str(), "red");
        assert!(check_tree(&tree).is_empty());
    }

    #[test]
    fn rejects_second_top_level_item() {
        let err = parse_outline("- A\n- B\n", Canvas::default()).unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                line: 2,
                message: "only one top-level item is allowed".into()
            }
        );
    }

    #[test]
    fn rejects_skipped_levels_and_odd_indent() {
        let err = parse_outline("- A\n      - deep\n", Canvas::default()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 2, .. }));
        let err = parse_outline("- A\n   - odd\n", Canvas::default()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 2, .. }));
        let err = parse_outline("- A\nplain text\n", Canvas::default()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 2, .. }));
    }

    #[test]
    fn empty_outline_is_an_error() {
        assert_eq!(
            parse_outline("# nothing here\n\n", Canvas::default()).unwrap_err(),
            ParseError::Empty
        );
    }
}
