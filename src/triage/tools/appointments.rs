// SPDX-License-Identifier: MIT

//! Appointment tools used by the appointments handler.
//!
//! Records are synthetic: there is no scheduling backend behind them.

use crate::adk::tool::Tool;
use async_trait::async_trait;
use chrono::Local;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;
use uuid::Uuid;

static PATIENT_NAME_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": "The name of the patient"
            }
        },
        "required": ["name"]
    })
});

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientArgs {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Looks up the appointment of a patient
pub struct SearchAppointmentsTool;

#[async_trait]
impl Tool for SearchAppointmentsTool {
    fn name(&self) -> &str {
        "search_appointments"
    }

    fn description(&self) -> &str {
        "Search, check or consult an appointment using name parameter"
    }

    fn schema(&self) -> &Value {
        &PATIENT_NAME_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let args: PatientArgs = serde_json::from_value(input)?;
        log::debug!("Searching appointment for {}", args.name);

        let appointment = Appointment {
            id: Some(Uuid::new_v4().to_string()),
            name: args.name,
            date: today(),
            time_slot: None,
        };
        Ok(serde_json::to_value(appointment)?)
    }
}

/// Books an appointment for a patient
pub struct BookAppointmentsTool;

#[async_trait]
impl Tool for BookAppointmentsTool {
    fn name(&self) -> &str {
        "book_appointments"
    }

    fn description(&self) -> &str {
        "Book appointment using name parameter"
    }

    fn schema(&self) -> &Value {
        &PATIENT_NAME_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let args: PatientArgs = serde_json::from_value(input)?;
        log::debug!("Booking appointment for {}", args.name);

        let appointment = Appointment {
            id: None,
            name: args.name,
            date: today(),
            time_slot: Some("10 AM".to_string()),
        };
        Ok(serde_json::to_value(appointment)?)
    }
}

/// Both appointment tools, ready to hand to an agent
pub fn create_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(SearchAppointmentsTool), Arc::new(BookAppointmentsTool)]
}
