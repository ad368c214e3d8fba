//! Business services for the checkout binary.

pub mod email;
pub mod payment;

pub use email::EmailService;
pub use payment::{PaymentOutcome, PaymentService};
