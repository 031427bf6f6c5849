//! # Inkflow Protocol
//!
//! The tag protocol parser: everything that turns raw LLM text into
//! structured results and directives.
//!
//! The wire grammar (bit-exact for compatibility):
//!
//! ```text
//! <kind+int> <title>…</title> <content>…</content> [<cover_text>…</cover_text> <hook>…</hook>] </kind+int>
//! <execute action="…" instruction="…"/>
//! <create_note><type>…</type><id>…</id><content>…</content></create_note>
//! <save_material><id>…</id><content>…</content></save_material>
//! <call_orchestrator>…</call_orchestrator>
//! <web_search{N}>…</web_search{N}>
//! <confirm{N}>…</confirm{N}>
//! ```
//!
//! Extraction is a hand-written scanner over tag boundaries, not a regex
//! pass: malformed or unclosed tags degrade to plain text instead of
//! derailing the whole parse.

pub mod concierge;
pub mod escape;
pub mod extract;
pub mod orchestrator;
pub mod scanner;

pub use concierge::{segment_confirms, split_directives, ConciergePiece, ConciergeSegment, SegmentKind};
pub use escape::escape_markdown;
pub use extract::{parse_response, ParseOutcome, ResultDraft, TagSchema, FALLBACK_MIN_RESULTS};
pub use orchestrator::{parse_execute_directives, ExecuteDirective};
pub use scanner::{split_tag_suffix, strip_tags, tokenize, Token, TokenKind};
