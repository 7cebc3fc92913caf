/// Name of the session cookie issued by the proxy on enrollment start.
pub const PROXY_COOKIE_NAME: &str = "defguard_proxy";

/// Pick the proxy session cookie out of a full `Set-Cookie` list.
///
/// Returns the `name=value` pair (attributes stripped) ready to be sent back
/// in a `Cookie` header. Cookies set by anything else on the path (load
/// balancers, auth gateways) are ignored. An empty value counts as absent.
pub fn extract_proxy_cookie<'a, I>(set_cookies: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    set_cookies.into_iter().find_map(|header| {
        let pair = header.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        if name.trim() == PROXY_COOKIE_NAME && !value.trim().is_empty() {
            Some(format!("{}={}", PROXY_COOKIE_NAME, value.trim()))
        } else {
            None
        }
    })
}
