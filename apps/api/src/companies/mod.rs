//! Client company list backing the report form.

pub mod handlers;
pub mod store;
