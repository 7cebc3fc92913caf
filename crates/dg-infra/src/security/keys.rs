use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use x25519_dalek::{PublicKey, StaticSecret};

use dg_core::enrollment::DeviceKeys;
use dg_core::ports::KeyGeneratorPort;
use dg_core::SecretString;

/// WireGuard (x25519) device keypair, base64 encoded as wg(8) prints it.
#[derive(Debug, Default, Clone, Copy)]
pub struct WireguardKeyGenerator;

impl KeyGeneratorPort for WireguardKeyGenerator {
    fn generate(&self) -> DeviceKeys {
        let secret = StaticSecret::random();
        let public = PublicKey::from(&secret);
        DeviceKeys {
            public: STANDARD.encode(public.as_bytes()),
            private: SecretString::new(STANDARD.encode(secret.to_bytes())),
        }
    }
}
