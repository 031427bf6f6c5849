//! The concierge's directive grammar and confirm/message segmentation.
//!
//! A concierge response interleaves free prose with side-effect tags
//! (`create_note`, `save_material`), queueing tags (`call_orchestrator`,
//! `web_search{N}`), and numbered `confirm{N}` blocks. Parsing happens in
//! two stages:
//!
//! 1. [`split_directives`] walks the text once and returns an ordered
//!    sequence of pieces — raw text runs and parsed directives. The
//!    dispatcher performs each side effect and substitutes its
//!    confirmation/placeholder string in place, so the grammar never
//!    leaks raw markup to the user.
//! 2. [`segment_confirms`] walks the cleaned text left-to-right and
//!    alternates "message" and "confirm" segments in encounter order.

use crate::escape::escape_markdown;
use crate::scanner::{find_close, split_tag_suffix, tokenize, Token, TokenKind};
use inkflow_core::Directive;
use std::collections::BTreeMap;
use tracing::warn;

/// One piece of a concierge response, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConciergePiece {
    /// A raw text run (unescaped; the dispatcher escapes at emission).
    Text(String),
    /// A parsed directive occupying this position in the text.
    Directive(Directive),
}

/// Split a concierge response into text runs and directives.
///
/// Directives are extracted once and never nested: the scan is a single
/// left-to-right pass. A structurally broken directive (missing close
/// tag, missing `id`) stays in the text verbatim so nothing is silently
/// swallowed.
pub fn split_directives(text: &str) -> Vec<ConciergePiece> {
    let tokens = tokenize(text);
    let mut pieces: Vec<ConciergePiece> = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    let mut flush = |buf: &mut String, pieces: &mut Vec<ConciergePiece>| {
        if !buf.is_empty() {
            pieces.push(ConciergePiece::Text(std::mem::take(buf)));
        }
    };

    while i < tokens.len() {
        let TokenKind::Open(name) = &tokens[i].kind else {
            buf.push_str(&tokens[i].raw);
            i += 1;
            continue;
        };

        match name.as_str() {
            "create_note" => {
                if let Some((directive, next)) = parse_create_note(&tokens, i, name) {
                    flush(&mut buf, &mut pieces);
                    pieces.push(ConciergePiece::Directive(directive));
                    i = next;
                    continue;
                }
            }
            "save_material" => {
                if let Some((directive, next)) = parse_save_material(&tokens, i, name) {
                    flush(&mut buf, &mut pieces);
                    pieces.push(ConciergePiece::Directive(directive));
                    i = next;
                    continue;
                }
            }
            "call_orchestrator" => {
                if let Some(close) = find_close(&tokens, i + 1, name) {
                    let instruction = inner_text(&tokens[i + 1..close]);
                    flush(&mut buf, &mut pieces);
                    pieces.push(ConciergePiece::Directive(Directive::CallOrchestrator {
                        instruction,
                    }));
                    i = close + 1;
                    continue;
                }
            }
            _ => {
                let (prefix, number) = split_tag_suffix(name);
                if prefix == "web_search" && number.is_some() {
                    if let Some(close) = find_close(&tokens, i + 1, name) {
                        let keyword = inner_text(&tokens[i + 1..close]);
                        flush(&mut buf, &mut pieces);
                        pieces.push(ConciergePiece::Directive(Directive::WebSearch { keyword }));
                        i = close + 1;
                        continue;
                    }
                }
            }
        }

        // Fell through: not a (well-formed) directive at this position.
        buf.push_str(&tokens[i].raw);
        i += 1;
    }

    if !buf.is_empty() {
        pieces.push(ConciergePiece::Text(buf));
    }
    pieces
}

fn parse_create_note(tokens: &[Token], open: usize, name: &str) -> Option<(Directive, usize)> {
    let close = find_close(tokens, open + 1, name)?;
    let fields = capture_fields(&tokens[open + 1..close], &["type", "id", "content"]);
    let id = fields.get("id").cloned().unwrap_or_default();
    if id.is_empty() {
        warn!("create_note directive without id, leaving as text");
        return None;
    }
    Some((
        Directive::CreateNote {
            note_type: fields.get("type").cloned().unwrap_or_default(),
            id,
            content: fields.get("content").cloned().unwrap_or_default(),
        },
        close + 1,
    ))
}

fn parse_save_material(tokens: &[Token], open: usize, name: &str) -> Option<(Directive, usize)> {
    let close = find_close(tokens, open + 1, name)?;
    let fields = capture_fields(&tokens[open + 1..close], &["id", "content"]);
    let id = fields.get("id").cloned().unwrap_or_default();
    if id.is_empty() {
        warn!("save_material directive without id, leaving as text");
        return None;
    }
    Some((
        Directive::SaveMaterial {
            id,
            content: fields.get("content").cloned().unwrap_or_default(),
        },
        close + 1,
    ))
}

/// Capture `<field>…</field>` children by name from a token run.
fn capture_fields(tokens: &[Token], wanted: &[&str]) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut i = 0;
    while i < tokens.len() {
        if let TokenKind::Open(name) = &tokens[i].kind {
            if wanted.contains(&name.as_str()) {
                if let Some(close) = find_close(tokens, i + 1, name) {
                    fields.insert(name.clone(), inner_text(&tokens[i + 1..close]));
                    i = close + 1;
                    continue;
                }
            }
        }
        i += 1;
    }
    fields
}

fn inner_text(tokens: &[Token]) -> String {
    let text: String = tokens.iter().map(|t| t.raw.as_str()).collect();
    text.trim().to_string()
}

/// A message or confirm segment of the cleaned concierge text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Message,
    Confirm,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConciergeSegment {
    pub kind: SegmentKind,
    /// Markdown-escaped display text.
    pub text: String,
}

/// Walk the cleaned response left-to-right, alternating message and
/// confirm segments in encounter order. With no confirm blocks the whole
/// text becomes a single message segment.
pub fn segment_confirms(text: &str) -> Vec<ConciergeSegment> {
    let tokens = tokenize(text);
    let mut segments: Vec<ConciergeSegment> = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    while i < tokens.len() {
        if let TokenKind::Open(name) = &tokens[i].kind {
            let (prefix, number) = split_tag_suffix(name);
            if prefix == "confirm" && number.is_some() {
                if let Some(close) = find_close(&tokens, i + 1, name) {
                    let message = buf.trim();
                    if !message.is_empty() {
                        segments.push(ConciergeSegment {
                            kind: SegmentKind::Message,
                            text: escape_markdown(message),
                        });
                    }
                    buf.clear();

                    segments.push(ConciergeSegment {
                        kind: SegmentKind::Confirm,
                        text: escape_markdown(&inner_text(&tokens[i + 1..close])),
                    });
                    i = close + 1;
                    continue;
                }
            }
        }
        buf.push_str(&tokens[i].raw);
        i += 1;
    }

    let tail = buf.trim();
    if !tail.is_empty() {
        segments.push(ConciergeSegment {
            kind: SegmentKind::Message,
            text: escape_markdown(tail),
        });
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_confirm_message() {
        let segments = segment_confirms("A<confirm1>B</confirm1>C");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].kind, SegmentKind::Message);
        assert_eq!(segments[0].text, "A");
        assert_eq!(segments[1].kind, SegmentKind::Confirm);
        assert_eq!(segments[1].text, "B");
        assert_eq!(segments[2].kind, SegmentKind::Message);
        assert_eq!(segments[2].text, "C");
    }

    #[test]
    fn no_confirms_single_message() {
        let segments = segment_confirms("就一句话。");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Message);
        assert_eq!(segments[0].text, "就一句话。");
    }

    #[test]
    fn adjacent_confirms_no_empty_messages() {
        let segments = segment_confirms("<confirm1>一</confirm1><confirm2>二</confirm2>");
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.kind == SegmentKind::Confirm));
    }

    #[test]
    fn split_create_note() {
        let text = "好的。<create_note><type>persona</type><id>3</id><content>理性测评向</content></create_note>已记录。";
        let pieces = split_directives(text);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], ConciergePiece::Text("好的。".into()));
        assert_eq!(
            pieces[1],
            ConciergePiece::Directive(Directive::CreateNote {
                note_type: "persona".into(),
                id: "3".into(),
                content: "理性测评向".into(),
            })
        );
        assert_eq!(pieces[2], ConciergePiece::Text("已记录。".into()));
    }

    #[test]
    fn split_save_material_and_search() {
        let text = "<save_material><id>m1</id><content>素材内容</content></save_material>\
稍等<web_search1>秋冬护肤成分</web_search1>";
        let pieces = split_directives(text);
        assert_eq!(
            pieces[0],
            ConciergePiece::Directive(Directive::SaveMaterial {
                id: "m1".into(),
                content: "素材内容".into(),
            })
        );
        assert_eq!(pieces[1], ConciergePiece::Text("稍等".into()));
        assert_eq!(
            pieces[2],
            ConciergePiece::Directive(Directive::WebSearch {
                keyword: "秋冬护肤成分".into(),
            })
        );
    }

    #[test]
    fn split_call_orchestrator() {
        let pieces =
            split_directives("<call_orchestrator>先做品牌分析再写笔记</call_orchestrator>");
        assert_eq!(
            pieces[0],
            ConciergePiece::Directive(Directive::CallOrchestrator {
                instruction: "先做品牌分析再写笔记".into(),
            })
        );
    }

    #[test]
    fn broken_directive_stays_as_text() {
        // No id: not a usable side effect, keep the markup visible
        // rather than dropping content.
        let text = "<create_note><type>x</type></create_note>";
        let pieces = split_directives(text);
        assert_eq!(pieces.len(), 1);
        assert!(matches!(&pieces[0], ConciergePiece::Text(t) if t.contains("create_note")));
    }

    #[test]
    fn directives_not_rescanned_inside_confirm() {
        // confirm segmentation runs on cleaned text; a confirm block
        // containing angle brackets keeps them as text.
        let segments = segment_confirms("<confirm1>a < b</confirm1>");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "a < b");
    }
}
