//! Clinova API service
//!
//! Multi-tenant clinic-management backend: organizations, patients,
//! appointments, users, medical records, and the plan-limits endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
