//! One module per CLI command.

mod authorize;
mod list;
mod login;
mod take;
mod terminate;

pub use authorize::{AuthorizeArgs, authorize};
pub use list::{ListArgs, list};
pub use login::{LoginArgs, login};
pub use take::{TakeArgs, take};
pub use terminate::{TerminateArgs, terminate};
