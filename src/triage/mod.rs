// SPDX-License-Identifier: MIT

//! Triage: a pulse-based graph engine and the attendant workflow running on it

pub mod config;
pub mod graph;
pub mod server;
pub mod state;
pub mod tools;
pub mod workflow;
