//! Signing key rotation demonstration.
//!
//! This demo shows how a session cookie issued under one signing key keeps
//! working after a new key is introduced, and stops working once the old key
//! is removed from the list.
//!
//! Run with: `cargo run --example key_rotation`

use session_gate::{
    flash, AuthGate, CookiePolicy, CookieSessionStore, FlashEntry, Principal, SessionRecord,
    SessionStore, SigningKeys,
};

fn store(secrets: &[&str]) -> CookieSessionStore {
    let keys = match SigningKeys::new(secrets.iter().copied()) {
        Ok(keys) => keys,
        Err(e) => panic!("demo keys are valid: {e}"),
    };
    CookieSessionStore::new(CookiePolicy::new(keys).with_secure(false))
}

fn cookie_pair(store: &CookieSessionStore, record: &SessionRecord) -> String {
    match store.commit(record) {
        Ok(set_cookie) => {
            println!("Set-Cookie: {}", set_cookie);
            set_cookie.as_str().split(';').next().unwrap_or_default().to_string()
        }
        Err(e) => panic!("demo record fits in a cookie: {e}"),
    }
}

fn main() {
    println!("=== Key Rotation Example ===\n");

    println!("--- Step 1: Log in under the 2024 key ---");
    let before = store(&["key-2024"]);
    let record = AuthGate::login(SessionRecord::new(), &Principal::new("op-1"));
    let record = flash::put(record, FlashEntry::success("Welcome back"));
    let cookie = cookie_pair(&before, &record);

    println!("\n--- Step 2: Rotate to the 2025 key, keeping 2024 for verification ---");
    let rotated = store(&["key-2025", "key-2024"]);
    let loaded = rotated.load(Some(&cookie));
    println!("Identity: {:?}", AuthGate::identify(&loaded));

    let (entry, loaded) = flash::take_one(loaded);
    println!("Flash shown once: {:?}", entry);
    let cookie = cookie_pair(&rotated, &loaded);

    println!("\n--- Step 3: Retire the 2024 key ---");
    let retired = store(&["key-2025"]);
    println!(
        "Re-signed cookie still valid: {}",
        AuthGate::identify(&retired.load(Some(&cookie))).is_authenticated()
    );

    let stale = cookie_pair(&before, &record);
    println!(
        "Cookie signed only with 2024 key: {:?}",
        AuthGate::identify(&retired.load(Some(&stale)))
    );

    println!("\n=== Example Complete ===");
}
