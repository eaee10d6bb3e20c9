//! One file per subcommand.

mod list;
mod resolve;
mod upload;

pub use list::run_list;
pub use resolve::run_resolve;
pub use upload::run_upload;
