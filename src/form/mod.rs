//! HIT forms: token extraction and per-row rendering.
//!
//! A form is an HTML fragment containing `${name}` tokens. Extraction
//! lists the tokens a form expects; rendering fills them from one row of
//! input fields.

pub mod extract;
pub mod render;

pub use extract::extract_fieldnames;
pub use render::{render_form, substitute_fields};
