//! Route handlers, one module per resource.
//!
//! Handlers only translate: request DTO → core input, call one engine
//! operation, core output → response DTO inside the success envelope.

pub mod health;
pub mod inventory;
pub mod invoices;
pub mod jobs;
pub mod sales;
