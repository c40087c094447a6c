//! FlightSurety Server Library
//!
//! HTTP and WebSocket surface over the flight-delay insurance ledger, plus the
//! optional in-process oracle simulator.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod oracle_simulator;
pub mod routes;
pub mod service;
pub mod websocket;
