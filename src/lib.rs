//! # da4revit-rs
//!
//! Backend broker between a browser model viewer and the APS platform.
//!
//! Submits Revit exports to Design Automation, tracks the outstanding work
//! items in memory, finishes them when the completion callback arrives, and
//! pushes status notifications to browser listeners over a WebSocket.

pub mod aps;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod server;
pub mod telemetry;
pub mod tracker;
