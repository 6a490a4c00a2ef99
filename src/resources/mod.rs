//! Entities of the deployment configuration, built bottom-up by [`crate::stack`]

pub mod app;
pub mod branch;
pub mod identity;
pub mod policy;
pub mod refs;
pub mod source;

pub use app::{AppHandle, AppProps, CustomRule, HostingApplication, PropertyOverrides};
pub use branch::{BranchProps, ProductionBranch};
pub use identity::{ExecutionIdentity, IdentityProps, ReadGrant};
pub use policy::{LoggingPolicy, PolicyDocument, PolicyStatement};
pub use refs::{ParameterRef, SecretRef, SecretValueRef};
pub use source::SourceBinding;

/// Tells the platform which sub-directory of the monorepo holds the app.
pub const MONOREPO_APP_ROOT_VAR: &str = "AMPLIFY_MONOREPO_APP_ROOT";
