//! Identity checks performed before a wallet may register or vote.
//!
//! Everything biometric here is simulated: captures are reduced to opaque
//! 32-byte hex digests and "verification" is a weighted coin flip. No
//! matching against stored data is performed. Callers must surface that to
//! users (API responses carry `simulated: true`).
//!
//! The phone OTP flow is real in the sense that codes are issued, stored
//! server-side with a time-to-live and consumed on first successful use.

pub mod capture;
pub mod error;
pub mod method;
pub mod otp;
pub mod random;
pub mod validation;

pub use capture::{FingerprintMode, GrayImage};
pub use error::VerificationError;
pub use method::{BiometricKind, BiometricOutcome, BiometricVerifier, SimulatedBiometricVerifier};
pub use otp::{format_phone_e164, IssuedOtp, OtpService, MAX_FAILED_ATTEMPTS};
pub use random::{RandomSource, SystemRandom};
pub use validation::{validate_national_id, validate_phone_number};
