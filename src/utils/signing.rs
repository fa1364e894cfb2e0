use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `payload` keyed by the account key, hex encoded
pub fn generate_signature(secret_key: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .expect("HMAC can take key of any size");

    mac.update(payload.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

/// Current time in milliseconds since the epoch
pub fn get_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_signature() {
        let secret = "test_secret_key";
        let payload = "auth|0xabc|1234567890";

        let signature = generate_signature(secret, payload);

        // Signature should be 64 character hex string
        assert_eq!(signature.len(), 64);

        // Same input should produce same signature
        assert_eq!(signature, generate_signature(secret, payload));

        // Different key, different signature
        assert_ne!(signature, generate_signature("other_key", payload));
    }

    #[test]
    fn test_timestamp() {
        let ts1 = get_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let ts2 = get_timestamp();

        assert!(ts2 > ts1);
    }
}
