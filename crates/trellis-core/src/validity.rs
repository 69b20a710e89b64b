//! Publish eligibility from the `__Hide version`, `__Valid from` and
//! `__Valid to` fields.
//!
//! Absent or blank date fields open the window fully. A date field holding
//! anything other than the store encoding is an error, not an open window.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, TrellisError};
use crate::model::Node;
use crate::model::fields::{self, HIDE_VERSION, VALID_FROM, VALID_TO};

/// The `[from, to]` range during which a node may be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidityWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub hidden: bool,
}

impl ValidityWindow {
    /// Window that never closes.
    #[must_use]
    pub const fn always() -> Self {
        Self {
            from: DateTime::<Utc>::MIN_UTC,
            to: DateTime::<Utc>::MAX_UTC,
            hidden: false,
        }
    }

    /// Read the window from a node's fields.
    ///
    /// # Errors
    ///
    /// [`TrellisError::InvalidDate`] when a date field is present but
    /// malformed.
    pub fn from_node(node: &Node) -> Result<Self> {
        Ok(Self {
            from: parse_date_or_default(
                VALID_FROM,
                node.field(VALID_FROM),
                DateTime::<Utc>::MIN_UTC,
            )?,
            to: parse_date_or_default(VALID_TO, node.field(VALID_TO), DateTime::<Utc>::MAX_UTC)?,
            hidden: fields::is_checked(node.field(HIDE_VERSION)),
        })
    }

    /// Both bounds inclusive. A hidden window contains nothing.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        !self.hidden && self.from <= now && now <= self.to
    }
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self::always()
    }
}

/// Parse a date field, using `default` when it is absent or blank.
///
/// # Errors
///
/// [`TrellisError::InvalidDate`] when `raw` is non-blank and not in the store
/// encoding.
pub fn parse_date_or_default(
    field: &str,
    raw: Option<&str>,
    default: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(value) => fields::parse_iso_date(value).ok_or_else(|| TrellisError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Whether `node` may be published at `now`. `false` for a `None` node.
///
/// # Errors
///
/// [`TrellisError::InvalidDate`] when a date field is malformed. A hidden
/// version is `false` without looking at the dates.
pub fn is_valid_for_publish(node: Option<&Node>, now: DateTime<Utc>) -> Result<bool> {
    let Some(node) = node else {
        return Ok(false);
    };
    if fields::is_checked(node.field(HIDE_VERSION)) {
        return Ok(false);
    }
    Ok(ValidityWindow::from_node(node)?.contains(now))
}
