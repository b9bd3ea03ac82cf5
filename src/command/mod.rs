//! External tool invocations
//!
//! - `builder`: turns settings and one entity into a `CommandSpec`
//! - `rewrite`: in-place username substitution applied to restore files

pub mod builder;
pub mod rewrite;

pub use builder::{build_command, dump_file_name, CommandSpec, SECRET_ENV_VAR};
pub use rewrite::UsernameRewrite;
