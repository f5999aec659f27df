//! Minimal XML-RPC client used to talk to the management server.
//!
//! Only the subset needed by satprep is implemented: method calls with
//! positional parameters, the standard scalar types plus `i8` and `nil`,
//! structs, arrays and faults.

pub mod codec;
pub mod error;
pub mod transport;
pub mod value;

pub use codec::{decode_response, encode_call};
pub use error::{RpcError, RpcResult};
pub use transport::HttpTransport;
pub use value::Value;
