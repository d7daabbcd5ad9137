use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a Meta webhook signature header (`sha256=<hex digest>`) against the
/// raw request body.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    app_secret: &str,
) -> Result<(), String> {
    if app_secret.is_empty() {
        return Err("Webhook app secret is not set".to_string());
    }

    let hex_digest = signature_header
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| "Invalid signature format".to_string())?;

    let signature = match decode_hex(hex_digest) {
        Some(sig) => sig,
        None => {
            debug!("Failed to decode signature hex");
            return Err("Invalid signature encoding".to_string());
        }
    };

    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };

    mac.update(payload);

    if mac.verify_slice(&signature).is_err() {
        debug!("Webhook signature verification failed");
        return Err("Invalid webhook signature".to_string());
    }

    Ok(())
}

/// Produce the header value Meta would send for `payload`.
pub fn sign_webhook_payload(payload: &[u8], app_secret: &str) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(payload);
    let digest = mac.finalize().into_bytes();

    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex))
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }

    (0..input.len())
        .step_by(2)
        .map(|i| input.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}
