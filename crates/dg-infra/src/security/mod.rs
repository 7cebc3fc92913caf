mod keys;

pub use keys::WireguardKeyGenerator;
