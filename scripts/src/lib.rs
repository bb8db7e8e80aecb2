//! Scripts for deploying and wiring the upgradeable NFT marketplace contracts.
//!
//! A deployment is described by a [`plan::DeploymentPlan`], validated into a
//! dependency-ordered [`plan::ValidatedPlan`], and executed step by step by an
//! [`orchestrator::Orchestrator`] against a [`backend::DeploymentBackend`].

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod backend;
pub mod cli;
mod commands;
pub mod constants;
pub mod deployments;
pub mod errors;
pub mod orchestrator;
pub mod plan;
mod solidity;
pub mod types;
pub mod utils;
