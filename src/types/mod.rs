//! Number types and typed buffers shared by both containers.
//!
//! The type bridge maps source number-type tags onto portable destination
//! types; [`Buffer`] carries the data of one dataset with its element type
//! folded into the variant.

mod bridge;
mod buffer;

pub use bridge::{map_type, source_tag, tag, DestType};
pub use buffer::{Buffer, Element};
pub(crate) use buffer::{map_array, with_array};
