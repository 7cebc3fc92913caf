use crate::enrollment::DeviceKeys;

/// Opaque keypair utility. The key algorithm is not the core's concern.
pub trait KeyGeneratorPort: Send + Sync {
    fn generate(&self) -> DeviceKeys;
}
