#![doc = "appsscript-deploy-core: core logic library for appsscript-deploy."]

//! This crate contains the data models, the remote-API contract and the deployment
//! pipeline. Network transport lives in the binary crate, behind the traits in [`contract`].
//!
//! # Usage
//! Resolve credentials with [`credentials::resolve_credentials`], collect sources with
//! [`collect::collect_script_files`], then hand both to [`deploy::Deployer`].

pub mod collect;
pub mod config;
pub mod contract;
pub mod credentials;
pub mod deploy;
pub mod diagnostics;
pub mod error;
