/// Deterministic bonding-curve address derivation for pump.fun tokens

use std::str::FromStr;

use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::debug;

pub const PUMP_FUN_PROGRAM_ID: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";
pub const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";

const PUMP_FUN_PROGRAM: Pubkey =
    solana_sdk::pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");

#[derive(Debug, Error)]
pub enum CurveError {
    #[error("invalid mint address: {0}")]
    InvalidMint(String),
}

/// Field names a feed payload may carry an already-known curve address under,
/// in priority order.
const CURVE_KEY_ALIASES: &[&str] = &[
    "bondingCurveKey",
    "bonding_curve_key",
    "bondingCurve",
    "bonding_curve",
    "curve",
    "curveKey",
    "curve_key",
    "curveAddress",
    "curve_address",
];

/// Derives the bonding curve PDA for a mint. Pure function of the mint and two
/// program constants; fails only on a malformed mint address.
pub fn derive_bonding_curve_address(mint: &str) -> Result<String, CurveError> {
    let mint_key =
        Pubkey::from_str(mint).map_err(|_| CurveError::InvalidMint(mint.to_string()))?;

    let (curve_address, _bump) = Pubkey::find_program_address(
        &[BONDING_CURVE_SEED, mint_key.as_ref()],
        &PUMP_FUN_PROGRAM,
    );

    Ok(curve_address.to_string())
}

/// Structural validation only: base58 text decoding to exactly 32 bytes.
pub fn is_valid_address(candidate: &str) -> bool {
    bs58::decode(candidate)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}

/// Extracts a curve address from the raw event if any alias carries a valid
/// one, otherwise derives it from the mint. `None` only when derivation fails.
pub fn resolve_bonding_curve(mint: &str, raw: &Value) -> Option<String> {
    for alias in CURVE_KEY_ALIASES {
        if let Some(candidate) = raw.get(alias).and_then(Value::as_str) {
            if is_valid_address(candidate) {
                return Some(candidate.to_string());
            }
        }
    }

    match derive_bonding_curve_address(mint) {
        Ok(address) => {
            debug!(mint = %mint, curve = %address, "Derived bonding curve address");
            Some(address)
        }
        Err(e) => {
            debug!(mint = %mint, error = %e, "Bonding curve derivation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

    #[test]
    fn derivation_is_deterministic() {
        let first = derive_bonding_curve_address(SOL_MINT).unwrap();
        let second = derive_bonding_curve_address(SOL_MINT).unwrap();
        assert_eq!(first, second);
        assert!(is_valid_address(&first));
        assert_ne!(first, SOL_MINT);
    }

    #[test]
    fn derivation_rejects_malformed_mint() {
        assert!(derive_bonding_curve_address("not-base58!").is_err());
        assert!(derive_bonding_curve_address("").is_err());
        // Valid base58 but wrong length
        assert!(derive_bonding_curve_address("abc").is_err());
    }

    #[test]
    fn address_validation_is_structural() {
        assert!(is_valid_address(SOL_MINT));
        assert!(is_valid_address(PUMP_FUN_PROGRAM_ID));
        assert!(!is_valid_address("abc"));
        assert!(!is_valid_address("0OIl"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn resolve_prefers_valid_extracted_key() {
        let raw = json!({ "bondingCurveKey": PUMP_FUN_PROGRAM_ID });
        let resolved = resolve_bonding_curve(SOL_MINT, &raw).unwrap();
        assert_eq!(resolved, PUMP_FUN_PROGRAM_ID);
    }

    #[test]
    fn resolve_skips_invalid_extracted_key_and_derives() {
        let raw = json!({ "curve": "garbage", "curve_key": 42 });
        let resolved = resolve_bonding_curve(SOL_MINT, &raw).unwrap();
        assert_eq!(resolved, derive_bonding_curve_address(SOL_MINT).unwrap());
    }

    #[test]
    fn resolve_returns_none_when_derivation_fails() {
        let raw = json!({});
        assert!(resolve_bonding_curve("bogus mint", &raw).is_none());
    }
}
