//! Domain models for the study population.
//!
//! This module contains the immutable facts a run operates on: clinical
//! events, patient demographic attributes, and the tagged value type used
//! for derived cohort variables.

pub mod event;
pub mod patient;
pub mod value;

pub use event::{ClinicalEvent, CodingSystem, PatientId, RawEvent};
pub use patient::{PatientAttributes, RegistrationInterval, Sex};
pub use value::VariableValue;
