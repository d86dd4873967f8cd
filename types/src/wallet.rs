//! The anonymous spending identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::PaymentId;

/// Wallet used to authenticate token refills.
///
/// It is distinct from any browsing identity and never appears in a
/// confirmation. The secret key is zeroized on drop and redacted from
/// `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Wallet {
    #[zeroize(skip)]
    pub payment_id: PaymentId,
    pub public_key_base64: String,
    pub secret_key_base64: String,
}

impl Wallet {
    pub fn new(
        payment_id: PaymentId,
        public_key_base64: impl Into<String>,
        secret_key_base64: impl Into<String>,
    ) -> Self {
        Self {
            payment_id,
            public_key_base64: public_key_base64.into(),
            secret_key_base64: secret_key_base64.into(),
        }
    }

    /// A wallet is usable only when every field is present.
    pub fn is_valid(&self) -> bool {
        !self.payment_id.is_empty()
            && !self.public_key_base64.is_empty()
            && !self.secret_key_base64.is_empty()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("payment_id", &self.payment_id)
            .field("public_key_base64", &self.public_key_base64)
            .field("secret_key_base64", &"********")
            .finish()
    }
}
