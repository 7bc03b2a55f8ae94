//! HTTP handlers, one module per resource. Handlers parse and validate the
//! request, call a service, and shape the response; no business logic here.

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod wishlists;
