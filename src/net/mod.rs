//! Transport-level plumbing shared by the client and the server.

pub mod stream;

pub use stream::{split, split_server, FrameReader, FrameWriter};
