//! Form rendering for a single HIT.

use crate::types::FieldMap;

/// Outer wrapper: draws the black box around the HIT.
pub const BORDER_OPEN: &str =
    "<div style=\" width:100%; border:2px solid black; margin-top:10px\">";

/// Inner wrapper: white space between the box and the form.
pub const MARGIN_OPEN: &str = "<div style=\"margin:10px\">";

const DIV_CLOSE: &str = "</div>";

/// Replace every `${key}` whose key is present in `fields` with its value.
///
/// A single left-to-right pass over `form`. At each `${` the longest field
/// key followed by `}` is taken, so keys may hold any text, `}` included.
/// Substituted values are copied verbatim and never rescanned, so a value
/// that itself looks like a token stays literal. Tokens without a matching
/// field are left in place.
pub fn substitute_fields(form: &str, fields: &FieldMap) -> String {
    let mut out = String::with_capacity(form.len());
    let mut rest = form;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let matched = fields
            .iter()
            .filter(|(key, _)| {
                after
                    .strip_prefix(key)
                    .is_some_and(|tail| tail.starts_with('}'))
            })
            .max_by_key(|(key, _)| key.len());

        match matched {
            Some((key, value)) => {
                out.push_str(value);
                rest = &after[key.len() + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Render a HIT: substitute its input fields into the form, then wrap the
/// result in the fixed margin and border containers.
pub fn render_form(form: &str, fields: &FieldMap) -> String {
    let body = substitute_fields(form, fields);
    let mut html = String::with_capacity(
        BORDER_OPEN.len() + MARGIN_OPEN.len() + body.len() + 2 * DIV_CLOSE.len(),
    );
    html.push_str(BORDER_OPEN);
    html.push_str(MARGIN_OPEN);
    html.push_str(&body);
    html.push_str(DIV_CLOSE);
    html.push_str(DIV_CLOSE);
    html
}
