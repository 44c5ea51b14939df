/// Path -> required permission level.
///
/// Patterns are split on `/` after trimming leading and trailing slashes.
/// `:name` segments accept any non-empty value; `#name` segments accept
/// digits only.
pub mod matcher;

pub use matcher::{PathPattern, PermissionError, PermissionRule, PermissionTable};
