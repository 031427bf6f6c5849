//! Numbered-block extraction — the content-agent half of the protocol.
//!
//! Given raw text and a kind's tag schema, produce the ordered result
//! drafts plus whatever text fell outside recognized tags. Sequence IDs
//! are not assigned here; the agent layer allocates them at emission.

use crate::escape::escape_markdown;
use crate::scanner::{find_close, split_tag_suffix, strip_tags, tokenize, Token, TokenKind};
use inkflow_core::AgentKind;
use std::collections::BTreeMap;
use tracing::debug;

/// The fallback threshold: responses that parse into fewer results than
/// this get the whole tag-stripped text appended as one more result.
/// Compatibility policy inherited from the reference behavior — the
/// value is load-bearing, not derived.
pub const FALLBACK_MIN_RESULTS: usize = 3;

/// Sub-tags recognized inside a block for one agent kind.
#[derive(Debug, Clone)]
pub struct TagSchema {
    pub kind: AgentKind,
    /// Kind-specific sub-tags beyond the always-recognized
    /// `title`/`content` (e.g. `cover_text`, `hook`).
    pub aux_fields: Vec<String>,
}

impl TagSchema {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            aux_fields: Vec::new(),
        }
    }

    pub fn with_aux(mut self, field: impl Into<String>) -> Self {
        self.aux_fields.push(field.into());
        self
    }

    fn is_aux(&self, name: &str) -> bool {
        self.aux_fields.iter().any(|f| f == name)
    }
}

/// One extracted result, before ID allocation. All text fields are
/// already markdown-escaped.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDraft {
    pub title: String,
    pub content: String,
    pub aux: BTreeMap<String, String>,
}

/// The parse outcome for one response.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Drafts in source order (including the fallback draft, when added).
    pub results: Vec<ResultDraft>,
    /// Markdown-escaped content found outside all recognized tags;
    /// `None` when empty. Attached to the emitted event as
    /// `agent_other_message`, never treated as a result.
    pub other: Option<String>,
}

/// Parse a full response for one agent kind.
///
/// Rules (reference semantics, reproduced exactly):
/// - blocks are returned in the order their tags appear;
/// - a block without `<title>` gets `"<label> N"`, N being its 1-based
///   position among the accepted results — not the raw tag's numeral;
/// - fewer than [`FALLBACK_MIN_RESULTS`] results on a non-empty response
///   additionally wraps the tag-stripped response as one more result.
pub fn parse_response(text: &str, schema: &TagSchema) -> ParseOutcome {
    let tokens = tokenize(text);
    let kind_tag = schema.kind.tag();

    let mut results: Vec<ResultDraft> = Vec::new();
    let mut other = String::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::Open(name) => {
                let (prefix, number) = split_tag_suffix(name);
                if prefix == kind_tag && number.is_some() {
                    if let Some(close) = find_close(&tokens, i + 1, name) {
                        let draft = parse_block(&tokens[i + 1..close], schema, results.len() + 1);
                        results.push(draft);
                        i = close + 1;
                        continue;
                    }
                }
                // Unrecognized or unclosed tag: its markup is other content.
                other.push_str(&tokens[i].raw);
                i += 1;
            }
            _ => {
                other.push_str(&tokens[i].raw);
                i += 1;
            }
        }
    }

    // Fallback: never hand a confusing partial/empty payload back for a
    // response that clearly said something.
    if results.len() < FALLBACK_MIN_RESULTS && !text.trim().is_empty() {
        let stripped = strip_tags(text);
        let stripped = stripped.trim();
        if !stripped.is_empty() {
            debug!(
                kind = kind_tag,
                parsed = results.len(),
                "below fallback threshold, wrapping full response as extra result"
            );
            let position = results.len() + 1;
            results.push(ResultDraft {
                title: synthesized_title(schema.kind, position),
                content: escape_markdown(stripped),
                aux: BTreeMap::new(),
            });
        }
    }

    let other = other.trim().to_string();
    ParseOutcome {
        results,
        other: if other.is_empty() {
            None
        } else {
            Some(escape_markdown(&other))
        },
    }
}

/// Parse the tokens inside one numbered block.
fn parse_block(tokens: &[Token], schema: &TagSchema, position: usize) -> ResultDraft {
    let mut title: Option<String> = None;
    let mut content: Option<String> = None;
    let mut aux: BTreeMap<String, String> = BTreeMap::new();
    let mut body = String::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::Open(name) if name == "title" || name == "content" || schema.is_aux(name) => {
                if let Some(close) = find_close(tokens, i + 1, name) {
                    let inner: String = tokens[i + 1..close].iter().map(|t| t.raw.as_str()).collect();
                    let inner = inner.trim().to_string();
                    match name.as_str() {
                        "title" => title = Some(inner),
                        "content" => content = Some(inner),
                        _ => {
                            aux.insert(name.clone(), escape_markdown(&inner));
                        }
                    }
                    i = close + 1;
                    continue;
                }
                body.push_str(&tokens[i].raw);
                i += 1;
            }
            _ => {
                body.push_str(&tokens[i].raw);
                i += 1;
            }
        }
    }

    // A block without an explicit <content> carries its content as the
    // bare body.
    let content = content.unwrap_or_else(|| body.trim().to_string());

    ResultDraft {
        title: match title {
            Some(t) if !t.is_empty() => escape_markdown(&t),
            _ => synthesized_title(schema.kind, position),
        },
        content: escape_markdown(&content),
        aux,
    }
}

fn synthesized_title(kind: AgentKind, position: usize) -> String {
    format!("{} {}", kind.label(), position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hitpoint_schema() -> TagSchema {
        TagSchema::new(AgentKind::Hitpoint)
    }

    fn xhs_schema() -> TagSchema {
        TagSchema::new(AgentKind::XhsPost)
            .with_aux("cover_text")
            .with_aux("hook")
    }

    #[test]
    fn three_blocks_in_source_order() {
        let text = "\
<hitpoint1><title>轻薄</title><content>仅重180克</content></hitpoint1>
<hitpoint2><title>长续航</title><content>两周一充</content></hitpoint2>
<hitpoint3><title>快充</title><content>十分钟回血</content></hitpoint3>";
        let outcome = parse_response(text, &hitpoint_schema());
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results[0].title, "轻薄");
        assert_eq!(outcome.results[1].title, "长续航");
        assert_eq!(outcome.results[2].title, "快充");
    }

    #[test]
    fn missing_title_synthesized_by_accept_position() {
        // Raw tag numerals deliberately do not match accept order.
        let text = "\
<hitpoint7><content>第一个</content></hitpoint7>
<hitpoint2><content>第二个</content></hitpoint2>
<hitpoint9><content>第三个</content></hitpoint9>";
        let outcome = parse_response(text, &hitpoint_schema());
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results[0].title, "卖点 1");
        assert_eq!(outcome.results[1].title, "卖点 2");
        assert_eq!(outcome.results[2].title, "卖点 3");
    }

    #[test]
    fn fallback_law_two_blocks_plus_prose() {
        let text = "\
开场白。
<hitpoint1><title>A</title><content>a</content></hitpoint1>
<hitpoint2><title>B</title><content>b</content></hitpoint2>";
        let outcome = parse_response(text, &hitpoint_schema());
        // 2 parsed + 1 fallback-wrapped
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results[2].title, "卖点 3");
        assert!(outcome.results[2].content.contains("开场白"));
        assert!(outcome.results[2].content.contains('a'));
    }

    #[test]
    fn fallback_not_added_at_threshold() {
        let text = "\
<hitpoint1><title>A</title><content>a</content></hitpoint1>
<hitpoint2><title>B</title><content>b</content></hitpoint2>
<hitpoint3><title>C</title><content>c</content></hitpoint3>
外面的话";
        let outcome = parse_response(text, &hitpoint_schema());
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.other.as_deref(), Some("外面的话"));
    }

    #[test]
    fn prose_only_response_yields_single_fallback() {
        let outcome = parse_response("这只是普通的一段回答。", &hitpoint_schema());
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].title, "卖点 1");
        assert_eq!(outcome.results[0].content, "这只是普通的一段回答。");
    }

    #[test]
    fn empty_response_yields_nothing() {
        let outcome = parse_response("   ", &hitpoint_schema());
        assert!(outcome.results.is_empty());
        assert!(outcome.other.is_none());
    }

    #[test]
    fn aux_fields_captured() {
        let text = "\
<xhs_post1><title>好物分享</title><content>正文</content>\
<cover_text>封面文案</cover_text><hook>停下来看看</hook></xhs_post1>";
        let outcome = parse_response(text, &xhs_schema());
        let first = &outcome.results[0];
        assert_eq!(first.aux.get("cover_text").unwrap(), "封面文案");
        assert_eq!(first.aux.get("hook").unwrap(), "停下来看看");
    }

    #[test]
    fn aux_fields_ignored_for_plain_schema() {
        let text =
            "<hitpoint1><title>T</title><content>c</content><hook>h</hook></hitpoint1>";
        let outcome = parse_response(text, &hitpoint_schema());
        // hook is not in the hitpoint schema: markup stays in the body,
        // which <content> supersedes.
        assert!(outcome.results[0].aux.is_empty());
    }

    #[test]
    fn unclosed_block_degrades_to_other_and_fallback() {
        let text = "<hitpoint1><title>悬空";
        let outcome = parse_response(text, &hitpoint_schema());
        // No well-formed block; the fallback wraps the stripped text.
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.results[0].content.contains("悬空"));
    }

    #[test]
    fn content_newlines_escaped() {
        let text = "<hitpoint1><title>T</title><content>第一行\n第二行</content></hitpoint1>";
        let outcome = parse_response(text, &hitpoint_schema());
        assert!(outcome.results[0].content.contains("\\n"));
    }

    #[test]
    fn other_content_never_silently_dropped() {
        let text = "\
前导说明
<hitpoint1><title>A</title><content>a</content></hitpoint1>
<hitpoint2><title>B</title><content>b</content></hitpoint2>
<hitpoint3><title>C</title><content>c</content></hitpoint3>
尾注";
        let outcome = parse_response(text, &hitpoint_schema());
        let other = outcome.other.unwrap();
        assert!(other.contains("前导说明"));
        assert!(other.contains("尾注"));
    }
}
