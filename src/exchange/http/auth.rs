use crate::utils::signing::generate_signature;

pub const ACCOUNT_HEADER: &str = "X-VAULT-ACCOUNT";
pub const TIMESTAMP_HEADER: &str = "X-VAULT-TIMESTAMP";
pub const SIGNATURE_HEADER: &str = "X-VAULT-SIGNATURE";

/// Message signed to obtain a session token
pub fn auth_message(account_id: &str, timestamp: i64) -> String {
    format!("auth|{}|{}", account_id, timestamp)
}

/// Headers proving control of `account_id` at `timestamp`
pub fn auth_headers(account_id: &str, account_key: &str, timestamp: i64) -> [(&'static str, String); 3] {
    let signature = generate_signature(account_key, &auth_message(account_id, timestamp));

    [
        (ACCOUNT_HEADER, account_id.to_string()),
        (TIMESTAMP_HEADER, timestamp.to_string()),
        (SIGNATURE_HEADER, signature),
    ]
}
