//! GroupDB - hierarchical-group query core
//!
//! Tables of one group are stored interleaved by key, so a parent row and its
//! descendants sit next to each other. This crate provides the row-type and
//! cursor execution model over such groups, together with the planner pieces
//! that choose join order and decide whether an index scan already delivers
//! the order a query needs.

pub mod config;
pub mod core;
pub mod query;
pub mod storage;
pub mod utils;
