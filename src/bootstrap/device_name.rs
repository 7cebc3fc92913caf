/// Name offered for a new device: the configured one, or the hostname.
pub fn default_device_name(configured: &str) -> String {
    let configured = configured.trim();
    if !configured.is_empty() {
        return configured.to_string();
    }
    let hostname = gethostname::gethostname();
    match hostname.to_str().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "Unknown Device".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_name_wins() {
        assert_eq!(default_device_name("  work-laptop "), "work-laptop");
    }

    #[test]
    fn empty_name_falls_back_to_hostname() {
        assert!(!default_device_name("").is_empty());
    }
}
