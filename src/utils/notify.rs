// src/utils/notify.rs

use std::sync::Arc;

/// Delivery seam for password-reset tokens.
///
/// The portal never emails directly; whatever transport is wired in here
/// receives the token and gets it to the user. Tests swap in a capturing
/// implementation to drive the reset flow end to end.
pub trait ResetNotifier: Send + Sync {
    fn deliver_reset_token(&self, email: &str, token: &str);
}

pub type SharedNotifier = Arc<dyn ResetNotifier>;

/// Default sink until an email provider is configured: logs the token at
/// debug level so an operator can relay it manually.
pub struct LogNotifier;

impl ResetNotifier for LogNotifier {
    fn deliver_reset_token(&self, email: &str, token: &str) {
        tracing::debug!(%email, %token, "Password reset token ready for delivery");
    }
}
