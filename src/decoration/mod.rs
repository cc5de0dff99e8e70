//! Decorations
//!
//! Visual annotations rendered as absolutely positioned overlay elements on
//! top of a frame document.
//!
//! # Architecture
//!
//! ```text
//!  Decoration ──► anchor ──► TextRange ──► layout ──► placements
//!  (selector,     (selector scope,        (client rects,     │
//!   text quote)    fuzzy quote match)      width policy)     ▼
//!                                                        markup
//!                                               (lol_html clone + position)
//!                                                            │
//!                                                            ▼
//!                                              ContentDocument::mount_overlay
//! ```
//!
//! [`DecorationEngine`] owns the per-frame state (templates, groups, laid-out
//! items). [`diff_decorations`] runs on the host to turn state changes into
//! the minimal set of channel commands.

pub mod anchor;
mod diff;
mod engine;
pub mod layout;
mod markup;
mod types;

pub use diff::{apply_changes, diff_decorations, unique_by_id, DecorationChange};
pub use engine::{DecorationEngine, DecorationHit, DecorationItem};
pub use markup::ElementTemplate;
pub use types::{
    Decoration, DecorationTemplate, TemplateLayout, TemplateRegistry, TemplateWidth, TextQuote,
};
