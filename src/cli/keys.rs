use crate::crypto::{KeyError, KeyPair};

/// Build a key pair from an optional hex seed, or generate a fresh one.
pub fn keypair_from_seed(seed: Option<&str>) -> Result<KeyPair, KeyError> {
    match seed {
        None => Ok(KeyPair::generate()),
        Some(hex_seed) => {
            let bytes = hex::decode(hex_seed).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|b: Vec<u8>| KeyError::InvalidLength(b.len()))?;
            Ok(KeyPair::from_seed(seed))
        }
    }
}

pub fn handle_keygen(seed: Option<String>) {
    match keypair_from_seed(seed.as_deref()) {
        Ok(pair) => {
            println!("Public Key: {}", pair.public_key());
            println!("Secret Key: {}", pair.secret_hex());
        }
        Err(e) => println!("Error: {}", e),
    }
}
