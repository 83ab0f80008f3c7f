//! Rollup Codes MCP Server
//!
//! A Model Context Protocol (MCP) server that exposes structured rollup metadata (chain IDs,
//! opcodes, precompiles, system contracts, timing parameters, messaging costs and RPC-call
//! differences) extracted from the rollup.codes documentation repository.

pub mod catalog;
pub mod chain_spec;
pub mod config;
pub mod error;
pub mod markdown;
pub mod server;
pub mod snapshot;
pub mod tools;

pub use catalog::{initialize_catalog, Catalog};
pub use server::RollupCodesHandler;
