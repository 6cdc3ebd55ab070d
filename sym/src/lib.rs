mod buf;
mod convert;
mod sym;

pub use crate::buf::*;
pub use crate::convert::concretize;
pub use crate::sym::*;
