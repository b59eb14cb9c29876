pub mod builder;
pub mod event;
pub mod parameters;
pub mod residual_error;
pub mod structs;
pub use builder::*;
pub use event::*;
pub use parameters::*;
pub use residual_error::*;
pub use structs::*;
