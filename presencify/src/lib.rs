//! Presencify site library
//!
//! Pricing catalog and handoff, contact form rules, portal access, backends
//! and the HTTP front end. The binary entry point is in main.rs.

pub mod config;
pub mod contact;
pub mod db;
pub mod handoff;
pub mod model;
pub mod nav;
pub mod portal;
pub mod pricing;
mod sql;
pub mod store;
pub mod web;
