//! Digest pipeline for Skiff.
//!
//! Locates the workspace agenda document, extracts a bounded prefix,
//! renders it to HTML, splices it into the mail template, and hands
//! the result to the mail transport.

mod error;
mod extract;
mod mail;
mod pipeline;
mod render;
mod template;

pub use error::DigestError;
pub use extract::section_window;
pub use mail::{HttpMailer, MailDelivery, MailTransport};
pub use pipeline::{DigestConfig, DigestPipeline};
pub use render::render_markdown;
pub use template::splice_template;
