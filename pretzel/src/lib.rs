mod decode;
pub mod ds_n_a;
mod encode;
mod error;
mod identity;
pub mod wire;

pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{PretzelError, Result};
pub use identity::{ObjId, ObjShared, Position};
