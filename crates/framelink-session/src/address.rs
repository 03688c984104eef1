use crate::options::CheckoutOptions;

/// Build the address a checkout loads from.
///
/// `<endpoint>[/<token>]?<routing>[#<public>]`. The fragment is left out when
/// the public partition is empty.
pub fn checkout_address(options: &CheckoutOptions, session_token: Option<&str>) -> String {
    let query = options.routing_options().to_query();
    let fragment = match options.public_options().to_fragment() {
        Ok(Some(encoded)) => format!("#{encoded}"),
        Ok(None) => String::new(),
        Err(err) => {
            tracing::warn!(error = %err, "public options not serializable; omitting fragment");
            String::new()
        }
    };

    match session_token.filter(|token| !token.is_empty()) {
        Some(token) => format!("{}/{token}?{query}{fragment}", options.endpoint),
        None => format!("{}?{query}{fragment}", options.endpoint),
    }
}
