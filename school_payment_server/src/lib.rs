//! # School payment server
//! This crate hosts the HTTP surface of the school payment gateway. It is responsible for:
//! * Accepting payment requests from school ERP clients and handing them to the payment gateway.
//! * Receiving the gateway's webhook notifications, logging them, and reconciling them with stored order status.
//! * Polling the gateway for the status of a payment on demand.
//! * Serving the transaction listings.
//!
//! All the business logic lives in `school_payment_engine`. This crate deals with HTTP, identity and configuration.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Payment, status and transaction routes. These need a bearer access token.
//! * `/webhook`: Notifications from the payment gateway.

pub mod alerts;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
