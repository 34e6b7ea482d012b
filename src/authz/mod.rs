//! Authorization mediation shared by the service emulators.
//!
//! Policy documents are loaded with [`loader`] and checked with
//! [`validator`] before they are trusted. Each inbound operation goes through
//! [`mediator::PermissionMediator`], which reads the caller's identity with
//! [`principal`] and, depending on the IAM mode, asks the external authority.

pub mod authority;
pub mod errors;
pub mod loader;
pub mod mediator;
pub mod principal;
pub mod types;
pub mod validator;
pub mod web;

pub use authority::{AuthorityClient, ConnectivityError, HttpAuthorityClient};
pub use errors::AuthzError;
pub use mediator::{Decision, Denial, IamMode, OutcomeClass, PermissionMediator};
pub use types::PolicyDocument;
pub use validator::ValidationResult;
