pub mod stripe;

pub use stripe::{to_minor_units, CreatePaymentIntent, PaymentIntent, Refund, StripeClient};
