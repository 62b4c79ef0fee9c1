//! Read-only views over a captured engine response
//!
//! Every function here is pure and recomputes its result from the text it
//! is given; nothing is cached.

use crate::core::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Separator between an object description and its handle, e.g. `table ip t # handle 3`
static HANDLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s#\shandle\s").expect("handle separator regex is valid"));

/// The representation a caller asks for
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum View {
    /// Response verbatim
    #[default]
    Text,
    /// One entry per non-empty output line
    Lines,
    /// Handle to object description
    Handles,
    /// Parsed JSON document
    Json,
}

/// Returns the response unmodified
pub fn text(response: &str) -> &str {
    response
}

/// Splits a response into lines with tabs and braces removed.
///
/// Empty lines, including lines left empty once a lone `{` or `}` is
/// stripped, are dropped. Lines holding only spaces are kept. Order follows
/// the engine output.
pub fn lines(response: &str) -> Vec<String> {
    let cleaned: String = response
        .chars()
        .filter(|c| !matches!(c, '\t' | '{' | '}'))
        .collect();

    cleaned
        .trim()
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Maps handle identifiers to the description of the object they belong to.
///
/// Only lines annotated with `# handle N` contribute, so the map is empty
/// unless the handle output flag was set when the command ran.
pub fn handles(response: &str) -> BTreeMap<String, String> {
    lines(response)
        .iter()
        .filter(|line| line.contains("handle"))
        .filter_map(|line| {
            let mut parts = HANDLE_SEPARATOR.split(line);
            let description = parts.next()?;
            let handle = parts.next()?;
            Some((handle.to_string(), description.trim().to_string()))
        })
        .collect()
}

/// Parses the response as the engine's JSON output.
///
/// # Errors
///
/// Returns `Error::Format` if the response is not valid JSON, which is
/// expected whenever the JSON output flag was not set.
pub fn json(response: &str) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(response)?)
}

/// Renders a response in the requested view for display
///
/// # Errors
///
/// Returns `Error::Format` for [`View::Json`] when the response is not JSON.
pub fn render(response: &str, view: View) -> Result<String> {
    Ok(match view {
        View::Text => text(response).to_string(),
        View::Lines => lines(response).join("\n"),
        View::Handles => handles(response)
            .iter()
            .map(|(handle, description)| format!("{handle}\t{description}"))
            .collect::<Vec<_>>()
            .join("\n"),
        View::Json => serde_json::to_string_pretty(&json(response)?)?,
    })
}
