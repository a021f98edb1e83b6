//! Phone one-time-password issuing and checking.

use std::sync::Arc;

use chainvote_store::{OtpChallenge, OtpStore};
use chainvote_types::{Clock, Timestamp, VoterAddress};
use serde::Serialize;

use crate::{RandomSource, VerificationError};

pub const CODE_DIGITS: u32 = 6;
pub const DEFAULT_TTL_SECS: u64 = 120;
/// Wrong guesses allowed before the outstanding code is discarded.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Normalise a phone number to E.164, treating bare numbers as Indian.
///
/// - `91` + 10 digits: `+` prepended
/// - `91` prefix and longer: truncated to 12 digits
/// - exactly 10 digits: `+91` prepended
/// - longer than 10 digits otherwise: last 10 digits under `+91`
/// - anything shorter is kept as an international number
///
/// Returns `None` when the input has no digits.
pub fn format_phone_e164(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let formatted = if digits.starts_with("91") && digits.len() == 12 {
        format!("+{digits}")
    } else if digits.starts_with("91") && digits.len() > 12 {
        format!("+{}", &digits[..12])
    } else if digits.len() == 10 {
        format!("+91{digits}")
    } else if digits.len() > 10 {
        format!("+91{}", &digits[digits.len() - 10..])
    } else if raw.trim().starts_with('+') {
        raw.trim().to_string()
    } else {
        format!("+{digits}")
    };
    Some(formatted)
}

/// A code that has been issued and stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedOtp {
    pub phone_number: String,
    pub expires_at: Timestamp,
    /// Only populated in demo mode, where no SMS gateway exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_code: Option<String>,
}

/// Issues codes into an [`OtpStore`] and checks them.
///
/// At most one code is outstanding per address; issuing again replaces it.
/// A code is consumed on successful verification and discarded on expiry or
/// after [`MAX_FAILED_ATTEMPTS`] wrong guesses.
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    ttl_secs: u64,
    demo_mode: bool,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        ttl_secs: u64,
        demo_mode: bool,
    ) -> Self {
        Self {
            store,
            clock,
            random,
            ttl_secs,
            demo_mode,
        }
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub fn issue(
        &self,
        address: &VoterAddress,
        phone: &str,
    ) -> Result<IssuedOtp, VerificationError> {
        let phone_number = format_phone_e164(phone)
            .ok_or_else(|| VerificationError::UnformattablePhone(phone.to_string()))?;
        let low = 10u64.pow(CODE_DIGITS - 1);
        let code = self.random.in_range(low, low * 10).to_string();
        let now = self.clock.now();
        let challenge = OtpChallenge {
            address: address.clone(),
            phone_number: phone_number.clone(),
            code: code.clone(),
            issued_at: now,
            expires_at: now.plus_secs(self.ttl_secs),
            failed_attempts: 0,
        };
        self.store.put(&challenge)?;
        tracing::info!(%address, phone = %phone_number, demo = self.demo_mode, "verification code issued");

        Ok(IssuedOtp {
            phone_number,
            expires_at: challenge.expires_at,
            demo_code: self.demo_mode.then_some(code),
        })
    }

    pub fn verify(&self, address: &VoterAddress, code: &str) -> Result<(), VerificationError> {
        let challenge = self
            .store
            .get(address)?
            .ok_or_else(|| VerificationError::OtpNotIssued(address.to_string()))?;

        if challenge.is_expired(self.clock.now()) {
            self.store.remove(address)?;
            return Err(VerificationError::OtpExpired);
        }
        if challenge.code != code.trim() {
            let failed_attempts = challenge.failed_attempts + 1;
            if failed_attempts >= MAX_FAILED_ATTEMPTS {
                self.store.remove(address)?;
                tracing::warn!(%address, "verification code discarded after repeated wrong guesses");
                return Err(VerificationError::OtpAttemptsExhausted);
            }
            self.store.put(&OtpChallenge {
                failed_attempts,
                ..challenge
            })?;
            return Err(VerificationError::OtpMismatch);
        }

        self.store.remove(address)?;
        tracing::info!(%address, "verification code accepted");
        Ok(())
    }
}
