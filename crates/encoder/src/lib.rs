//! Document and range serialization engine.
//!
//! An encoder is initialised with a document, an output MIME type and
//! [`EncoderFlags`], optionally narrowed to a selection, range or node, and
//! then encoded to a string or to a byte stream in a target charset. The
//! [`HtmlCopyEncoder`] variant prepares clipboard payloads: it widens copied
//! ranges to whole elements and reports the paste context around them.

pub mod context;
pub mod copy_encoder;
pub mod document_encoder;
pub mod error;
pub mod fixup;
pub mod flags;
pub mod mime;
pub mod node_serializer;
pub mod range_serializer;
pub mod serializer;
pub mod streamer;
pub mod visibility;

mod buffer;
mod promote;

pub use buffer::OutputBuffer;
pub use context::{NoRangeContext, RangeContextSerializer, RangeNodeContext};
pub use copy_encoder::{CopyContext, HtmlCopyEncoder};
pub use document_encoder::{ContextEncoding, DEFAULT_WRAP_COLUMN, DocumentEncoder, Encoder};
pub use error::EncodeError;
pub use fixup::{Fixup, NodeFixup};
pub use flags::EncoderFlags;
pub use mime::OutputFormat;
pub use node_serializer::{NodeSerializer, SerializeRoot};
pub use range_serializer::{ContextInfoDepth, RangeReport, RangeSerializer};
pub use serializer::{ContentSerializer, MarkupSerializer, PlainTextSerializer, SerializerConfig};
pub use streamer::{CharsetEncoder, TextStreamer};
pub use visibility::{DomVisibility, Visibility};
