mod option;
mod range;
mod session;
mod task;

pub use option::*;
pub use range::*;
pub use session::*;
pub use task::*;
