//! Common types used throughout `git-delivery`.
//!
//! A request path such as `/github/octocat/Hello-World/README` names a remote
//! repository and a file inside it. This crate turns that path into a
//! [`RepoReference`] and a [`RelativeFilePath`] without touching the network
//! or the filesystem.

mod error;
mod path;
mod repository;
mod resolve;

pub use error::ParseError;
pub use path::RelativeFilePath;
pub use repository::{Credentials, RepoReference, HOST_ALIASES};
pub use resolve::resolve;
