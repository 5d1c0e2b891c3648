//! Pagesmith: user-script registration and injection coordination for
//! page-tweaking browser extensions.
//!
//! Generated code becomes a persistent registration bound to a stable id and
//! a site-wide match pattern, or a tagged stylesheet for CSS. The UI surface,
//! the background coordinator and the in-page agent talk only through the
//! message protocol in [`protocol`].

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod protocol;
pub mod registry;

pub use error::{PagesmithError, RegistrationError, Result};
pub use registry::{Coordinator, ScriptRegistration};
