//! Query line parsing.
//!
//! Syntax: `[field:]value`, split on the first `:`.
//! - `value` alone matches the record identifier.
//! - `field:value` matches `value` at the dotted path `data.<field>`; the
//!   field must spell out prefixed names, e.g. `#A.#b:value2`.
//! - `_id:value` is accepted as an explicit identifier match.

use crate::model::document::{DATA_KEY, RECORD_ID_KEY};
use crate::store::Filter;
use log::debug;

/// Parses one query line into an equality filter.
///
/// The line is taken verbatim; callers strip line terminators.
pub fn parse_query(line: &str) -> Filter {
    let filter = match line.split_once(':') {
        None => Filter::by_id(line),
        Some((field, value)) if field == RECORD_ID_KEY => Filter::by_id(value),
        Some((field, value)) => Filter::by_path(&format!("{DATA_KEY}.{field}"), value),
    };
    debug!(
        "event=query_parse module=codec status=ok path={}",
        filter.dotted_path()
    );
    filter
}
