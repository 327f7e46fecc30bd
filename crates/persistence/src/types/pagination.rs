//! Offset cursors and page metadata.
//!
//! A cursor is an opaque token: the base64 encoding of `DL_<offset>`. The empty
//! cursor means "first page". Malformed cursors are rejected rather than
//! silently restarting at offset 0.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

const CURSOR_PREFIX: &str = "DL_";

/// Encodes an offset as an opaque cursor.
pub fn encode_cursor(offset: usize) -> String {
    STANDARD.encode(format!("{}{}", CURSOR_PREFIX, offset))
}

/// Decodes a cursor into an offset. The empty cursor decodes to 0.
pub fn decode_cursor(cursor: &str) -> RepoResult<usize> {
    if cursor.is_empty() {
        return Ok(0);
    }

    let bytes = STANDARD
        .decode(cursor)
        .map_err(|e| invalid_cursor(format!("cannot decode {:?}: {}", cursor, e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| invalid_cursor(format!("cursor {:?} is not valid UTF-8", cursor)))?;
    let offset = text
        .strip_prefix(CURSOR_PREFIX)
        .ok_or_else(|| invalid_cursor(format!("cursor {:?} has no {} prefix", cursor, CURSOR_PREFIX)))?;
    let offset = offset
        .parse::<usize>()
        .map_err(|_| invalid_cursor(format!("offset {:?} is not a non-negative integer", offset)))?;
    if offset > i64::MAX as usize {
        return Err(invalid_cursor(format!("offset {} is out of range", offset)));
    }
    Ok(offset)
}

/// Encodes the cursor of the page following the one at `offset`.
pub fn encode_next_offset_cursor(offset: usize, page_size: usize) -> String {
    encode_cursor(offset.saturating_add(page_size))
}

/// Fails with [`RepoError::InvalidData`] when `page_size` is zero.
pub fn validate_page_size(page_size: usize) -> RepoResult<()> {
    if page_size < 1 {
        return Err(RepoError::invalid_data("page size cannot be smaller than 1"));
    }
    Ok(())
}

fn invalid_cursor(detail: String) -> RepoError {
    RepoError::invalid_data(format!("cursor is not correct: {}", detail))
}

/// Position of a returned page within the full result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// The cursor the page was requested with.
    pub start_cursor: String,
    /// Cursor of the following page; set only when there is one.
    pub end_cursor: Option<String>,
    /// Whether more rows follow this page.
    pub has_next_page: bool,
}

impl PageInfo {
    /// Derives page metadata.
    ///
    /// `has_next_page` is `total_count > offset + returned`; the end cursor
    /// points at `offset + page_size` and is only present when there is a
    /// next page.
    pub fn compute(
        cursor: &str,
        offset: usize,
        page_size: usize,
        returned: usize,
        total_count: usize,
    ) -> Self {
        let has_next_page = total_count > offset.saturating_add(returned);
        Self {
            start_cursor: cursor.to_string(),
            end_cursor: has_next_page.then(|| encode_next_offset_cursor(offset, page_size)),
            has_next_page,
        }
    }
}

/// One page of records together with the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The records of this page, in query order.
    pub items: Vec<T>,
    /// Cursor metadata.
    pub page_info: PageInfo,
    /// Number of rows matching the query across all pages.
    pub total_count: usize,
}

impl<T> Page<T> {
    /// Returns true if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }
}
