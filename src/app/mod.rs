pub mod attestation;
pub mod workflow_controller;
