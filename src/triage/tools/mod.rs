// SPDX-License-Identifier: MIT

//! Tools available to the handler agents

pub mod appointments;
pub mod retrieve;

pub use appointments::{BookAppointmentsTool, SearchAppointmentsTool};
pub use retrieve::{Document, DocumentStore, InMemoryDocumentStore, RetrieveTool};
