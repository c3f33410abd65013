//! Payment providers mapped onto user tiers: Stripe pushes signed webhook
//! events, PayPal subscriptions are looked up on demand.

pub mod paypal;
pub mod stripe;

pub use paypal::{PayPalClient, PayPalSubscription};
pub use stripe::{StripeEvent, WebhookOutcome, handle_stripe_event};
