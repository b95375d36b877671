//! Skyfold Core - Domain model and port definitions
//!
//! This crate is the hexagonal core of the Skyfold sync engine:
//! - **Domain entities** - `Item`, the task records, `LocalCachedFileInfo`
//! - **Validated newtypes** - `ItemId`, `RemotePath`, `PageToken`
//! - **Port definitions** - `IRemoteStore`, `IMetadataStore`, the task record
//!   stores and `ICachedFileRegistry`
//! - **Configuration** - YAML-backed `Config` with validation
//!
//! # Architecture
//!
//! The domain module has no I/O. Ports define the trait interfaces that the
//! persistence crate (`skyfold-cache`) and remote store adapters implement,
//! and that the engine (`skyfold-sync`) consumes.

pub mod config;
pub mod domain;
pub mod ports;
