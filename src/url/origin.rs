use url::{Origin, Url};

/// Returns the origin (scheme, host, port) of a URL
pub fn origin_of(url: &Url) -> Origin {
    url.origin()
}

/// Checks whether `url` belongs to `origin`
///
/// This is a structural comparison, so `http://shop.test.evil.com` is not
/// mistaken for a page of `http://shop.test` the way a string prefix
/// check would.
pub fn is_same_origin(url: &Url, origin: &Origin) -> bool {
    origin.is_tuple() && url.origin() == *origin
}
