//! # Kaudit Core
//!
//! Core types shared by every stage of the kaudit request-auditing pipeline.
//!
//! This crate provides the foundational data structures used throughout the
//! kaudit workspace, including:
//!
//! - [`AuditLevel`] - Ordered verbosity level selected by the audit policy
//! - [`PolicyConfig`] - The cluster-wide auditing policy object
//! - [`UserInfo`] - Authenticated principal captured from the request
//! - [`RequestInfo`] - Pre-computed routing metadata describing the request target
//!
//! ## Example
//!
//! ```rust
//! use kaudit_core::{AuditLevel, PolicyConfig, RequestInfo, UserInfo};
//!
//! let policy = PolicyConfig::new("kube-auditing-webhook", AuditLevel::Metadata);
//! assert!(policy.level.is_enabled());
//!
//! let user = UserInfo::new("admin").with_groups(["system"]);
//! assert_eq!(user.groups, vec!["system".to_string()]);
//!
//! let info = RequestInfo::resource("create", "tenant.kubesphere.io", "v1alpha2", "workspaces")
//!     .with_name("test");
//! assert!(info.names_resource());
//! ```

pub mod error;
pub mod identity;
pub mod level;
pub mod policy;
pub mod request;

#[cfg(test)]
mod proptest_tests;

pub use error::{Error, Result};
pub use identity::UserInfo;
pub use level::AuditLevel;
pub use policy::{PolicyConfig, DEFAULT_POLICY_NAME};
pub use request::RequestInfo;
