//! # kaudit-test
//!
//! Test support for the kaudit pipeline.
//!
//! - [`MockUser`] builds [`UserInfo`](kaudit_core::UserInfo) principals
//! - [`RequestBuilder`] builds inbound requests carrying principal, routing
//!   metadata and client address headers
//! - [`fixtures`] holds the policies and routing metadata of common scenarios
//! - [`test_utils`] parses emitted events and asserts on their shape
//!
//! ```rust
//! use kaudit_test::{MockUser, RequestBuilder};
//!
//! let request = RequestBuilder::new()
//!     .method("POST")
//!     .uri("/kapis/tenant.kubesphere.io/v1alpha2/workspaces")
//!     .client_ip("192.168.0.2")
//!     .user(MockUser::admin())
//!     .build();
//!
//! assert_eq!(request.headers()["x-client-ip"], "192.168.0.2");
//! ```

pub mod fixtures;
pub mod mock_identity;
pub mod test_utils;

pub use fixtures::{policy, policy_store_yaml, workspace_create_info};
pub use mock_identity::MockUser;
pub use test_utils::{assert_absent, parse_event, RequestBuilder};
