// SPDX-License-Identifier: MIT

//! Agent development kit: the collaborator contracts the graph nodes call into

pub mod agent;
pub mod error;
pub mod model;
pub mod tool;
