//! Page location as seen at startup: the route path and the `ref` query
//! parameter that carries a referral code.

use url::Url;

/// Path of the landing page, the only route the onboarding prompt shows on.
pub const ROOT_ROUTE: &str = "/";

/// Query parameter carrying a referral code.
pub const REFERRAL_PARAM: &str = "ref";

const RELATIVE_BASE: &str = "http://localhost/";

/// Whether `route` is the landing page.
pub fn is_root_route(route: &str) -> bool {
    route == ROOT_ROUTE
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLocation {
    pub path: String,
    /// First non-empty `ref` parameter.
    pub referral: Option<String>,
}

impl PageLocation {
    /// Parse an absolute URL or a path-plus-query such as `/?ref=abc`.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_BASE)?.join(input)?,
            Err(e) => return Err(e),
        };
        let referral = url
            .query_pairs()
            .find(|(key, _)| key == REFERRAL_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());
        Ok(Self {
            path: url.path().to_string(),
            referral,
        })
    }
}
