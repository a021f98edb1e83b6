//! OTP service behaviour over an in-memory store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chainvote_store::{OtpChallenge, OtpStore, StoreError};
use chainvote_types::{Clock, Timestamp, VoterAddress};
use chainvote_verification::{OtpService, RandomSource, VerificationError, MAX_FAILED_ATTEMPTS};

#[derive(Default)]
struct MemoryOtpStore(Mutex<HashMap<VoterAddress, OtpChallenge>>);

impl OtpStore for MemoryOtpStore {
    fn put(&self, challenge: &OtpChallenge) -> Result<(), StoreError> {
        self.0
            .lock()
            .unwrap()
            .insert(challenge.address.clone(), challenge.clone());
        Ok(())
    }

    fn get(&self, address: &VoterAddress) -> Result<Option<OtpChallenge>, StoreError> {
        Ok(self.0.lock().unwrap().get(address).cloned())
    }

    fn remove(&self, address: &VoterAddress) -> Result<bool, StoreError> {
        Ok(self.0.lock().unwrap().remove(address).is_some())
    }
}

struct StepClock(AtomicU64);

impl Clock for StepClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.0.load(Ordering::SeqCst))
    }
}

struct Fixed(u64);

impl RandomSource for Fixed {
    fn next_u64(&self) -> u64 {
        self.0
    }
}

fn addr() -> VoterAddress {
    VoterAddress::parse("0x00000000000000000000000000000000000000aa").unwrap()
}

fn service(demo: bool) -> (Arc<StepClock>, Arc<MemoryOtpStore>, OtpService) {
    let clock = Arc::new(StepClock(AtomicU64::new(1_000)));
    let store = Arc::new(MemoryOtpStore::default());
    // 123 % 900_000 + 100_000
    let svc = OtpService::new(store.clone(), clock.clone(), Arc::new(Fixed(123)), 120, demo);
    (clock, store, svc)
}

#[test]
fn issue_stores_six_digit_code() {
    let (_clock, store, svc) = service(true);
    let issued = svc.issue(&addr(), "9876543210").unwrap();

    assert_eq!(issued.phone_number, "+919876543210");
    assert_eq!(issued.expires_at, Timestamp::new(1_120));
    assert_eq!(issued.demo_code.as_deref(), Some("100123"));

    let stored = store.get(&addr()).unwrap().unwrap();
    assert_eq!(stored.code, "100123");
    assert_eq!(stored.code.len(), 6);
}

#[test]
fn production_mode_hides_code() {
    let (_clock, _store, svc) = service(false);
    let issued = svc.issue(&addr(), "9876543210").unwrap();
    assert!(issued.demo_code.is_none());
}

#[test]
fn correct_code_is_single_use() {
    let (_clock, _store, svc) = service(true);
    svc.issue(&addr(), "9876543210").unwrap();

    svc.verify(&addr(), "100123").unwrap();
    assert!(matches!(
        svc.verify(&addr(), "100123"),
        Err(VerificationError::OtpNotIssued(_))
    ));
}

#[test]
fn wrong_code_keeps_challenge() {
    let (_clock, _store, svc) = service(true);
    svc.issue(&addr(), "9876543210").unwrap();

    assert!(matches!(
        svc.verify(&addr(), "999999"),
        Err(VerificationError::OtpMismatch)
    ));
    svc.verify(&addr(), " 100123 ").unwrap();
}

#[test]
fn repeated_wrong_codes_discard_challenge() {
    let (_clock, store, svc) = service(true);
    svc.issue(&addr(), "9876543210").unwrap();

    for n in 1..MAX_FAILED_ATTEMPTS {
        assert!(matches!(
            svc.verify(&addr(), "999999"),
            Err(VerificationError::OtpMismatch)
        ));
        assert_eq!(store.get(&addr()).unwrap().unwrap().failed_attempts, n);
    }
    assert!(matches!(
        svc.verify(&addr(), "999999"),
        Err(VerificationError::OtpAttemptsExhausted)
    ));
    assert!(store.get(&addr()).unwrap().is_none());
    // the right code no longer helps
    assert!(svc.verify(&addr(), "100123").is_err());
}

#[test]
fn reissue_resets_attempts() {
    let (_clock, store, svc) = service(true);
    svc.issue(&addr(), "9876543210").unwrap();
    svc.verify(&addr(), "999999").unwrap_err();
    svc.issue(&addr(), "9876543210").unwrap();
    assert_eq!(store.get(&addr()).unwrap().unwrap().failed_attempts, 0);
}

#[test]
fn expired_code_is_discarded() {
    let (clock, store, svc) = service(true);
    svc.issue(&addr(), "9876543210").unwrap();

    clock.0.store(1_120, Ordering::SeqCst);
    assert!(matches!(
        svc.verify(&addr(), "100123"),
        Err(VerificationError::OtpExpired)
    ));
    assert!(store.get(&addr()).unwrap().is_none());
}

#[test]
fn no_fixed_backdoor_code() {
    let (_clock, _store, svc) = service(true);
    svc.issue(&addr(), "9876543210").unwrap();
    assert!(svc.verify(&addr(), "123456").is_err());
}

#[test]
fn unformattable_phone_rejected() {
    let (_clock, _store, svc) = service(true);
    assert!(matches!(
        svc.issue(&addr(), "no digits"),
        Err(VerificationError::UnformattablePhone(_))
    ));
}
