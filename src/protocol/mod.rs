//! The wire protocol: frame envelope, payload primitives, and the
//! operation layer built on top of them.

pub mod codec;
pub mod frame;
pub mod op;

pub use frame::{Frame, STATUS_ERR, STATUS_OK};
pub use op::{decode_request, AggrKind, OpCode, Request};
