//! Core types shared by the repository primitives.
//!
//! - [`PageInfo`], [`Page`] - page metadata and paged results
//! - [`encode_cursor`], [`decode_cursor`] - the offset cursor codec

mod pagination;

pub use pagination::{
    Page, PageInfo, decode_cursor, encode_cursor, encode_next_offset_cursor, validate_page_size,
};
