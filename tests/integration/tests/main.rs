//! End-to-end tests.
//!
//! The service provider is driven through its public facade against a test
//! identity provider that signs and encrypts real messages.

mod common;
mod config_files;
mod login_request;
mod login_response;
mod logout;
mod metadata;
