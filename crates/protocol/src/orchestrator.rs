//! The orchestrator's directive grammar: `<execute action="X" instruction="Y"/>`.
//!
//! Self-closing, attribute-based, never nested. Parsing returns the raw
//! (action, instruction) pairs in source order; mapping `action` onto an
//! agent kind — and reporting unknown actions — is the dispatcher's job.

use crate::scanner::{tokenize, TokenKind};
use tracing::warn;

/// One `<execute/>` directive as it appeared in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteDirective {
    pub action: String,
    pub instruction: String,
}

/// Extract all execute directives from an orchestrator response.
///
/// A directive missing either attribute is malformed and skipped with a
/// warning; the rest of the text is unaffected.
pub fn parse_execute_directives(text: &str) -> Vec<ExecuteDirective> {
    let mut directives = Vec::new();

    for token in tokenize(text) {
        let TokenKind::SelfClose { name, attrs } = token.kind else {
            continue;
        };
        if name != "execute" {
            continue;
        }

        let attr = |key: &str| {
            attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        match (attr("action"), attr("instruction")) {
            (Some(action), Some(instruction)) => {
                directives.push(ExecuteDirective {
                    action,
                    instruction,
                });
            }
            _ => {
                warn!(raw = %token.raw, "malformed execute directive, skipping");
            }
        }
    }

    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directives_in_order() {
        let text = r#"先分析。
<execute action="brand_analysis" instruction="分析品牌调性"/>
再写笔记。
<execute action="xhs_post" instruction="写三篇种草笔记"/>"#;
        let directives = parse_execute_directives(text);
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].action, "brand_analysis");
        assert_eq!(directives[0].instruction, "分析品牌调性");
        assert_eq!(directives[1].action, "xhs_post");
    }

    #[test]
    fn unknown_action_still_parses() {
        // Mapping (and rejecting) actions is the dispatcher's concern.
        let directives =
            parse_execute_directives(r#"<execute action="nonsense" instruction="x"/>"#);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].action, "nonsense");
    }

    #[test]
    fn missing_attribute_is_skipped() {
        let directives = parse_execute_directives(r#"<execute action="hitpoint"/>"#);
        assert!(directives.is_empty());
    }

    #[test]
    fn non_execute_self_closing_ignored() {
        let directives = parse_execute_directives(r#"<br/><execute action="a" instruction="b"/>"#);
        assert_eq!(directives.len(), 1);
    }
}
