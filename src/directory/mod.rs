//! Account Directory: the host credential store the annex issues commands to.
//! Keep the public surface thin and split implementation across sub-modules.

mod record;
mod store;
mod local;

pub use record::AccountRecord;
pub use store::{AccountDirectory, DirectoryError};
pub use local::LocalDirectory;
