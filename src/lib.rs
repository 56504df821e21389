//! govchain - a tamper-evident, hash-linked ledger with single-vote governance
//!
//! # Architecture
//!
//! ## Core
//! - [`blockchain`] - Blocks, canonical digests, append and chain verification
//! - [`governance`] - Proposals and the one-vote-per-proposal rule
//!
//! ## State Management
//! - [`persistence`] - Store abstraction (SQLite and in-memory)
//! - [`node`] - Service facade pairing the core with a store
//!
//! ## Integration
//! - [`api`] - REST API (axum)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core
// ============================================================================
pub mod blockchain;
pub mod governance;

// ============================================================================
// State Management
// ============================================================================
pub mod node;
pub mod persistence;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
