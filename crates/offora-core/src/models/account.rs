use serde::{Deserialize, Serialize};

use super::StoreDraft;

/// Customer sign-up form.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Vendor sign-up: an account plus the store it owns.
#[derive(Debug, Clone, Serialize)]
pub struct VendorRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub store: StoreDraft,
}

/// What the backend echoes back after registration (password is write-only).
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredAccount {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPrefill {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Payment order created for the vendor subscription. The payment widget
/// consumes it; this client only relays it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutOrder {
    pub order_id: String,
    /// Smallest currency unit (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub key: String,
    pub name: String,
    pub description: String,
    pub prefill: CheckoutPrefill,
}

impl CheckoutOrder {
    pub fn amount_display(&self) -> String {
        format!("{} {}.{:02}", self.currency, self.amount / 100, self.amount % 100)
    }
}

/// Proof of payment returned by the widget, sent back for verification.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentConfirmation {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}
