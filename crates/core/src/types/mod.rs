//! Core types for Patinhas.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod method;
pub mod money;
pub mod order;
pub mod status;

pub use id::*;
pub use identity::{Document, DocumentError, Email, EmailError};
pub use method::{CardData, PaymentMethod};
pub use money::Amount;
pub use order::{
    Address, CheckoutCustomer, CheckoutRequest, NewOrder, Order, OrderItem,
};
pub use status::{OrderStatus, PaymentStatus};
