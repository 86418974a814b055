use url::Url;

/// Set each `(key, value)` on `url`, replacing existing values for those
/// keys and keeping every other parameter in its original order.
pub(crate) fn set_query_params(url: &mut Url, params: &[(&str, &str)]) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !params.iter().any(|(key, _)| k == key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in &kept {
        pairs.append_pair(k, v);
    }
    for (k, v) in params {
        pairs.append_pair(k, v);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn replaces_named_and_keeps_others() {
        let mut url = Url::parse("wss://portal.example.net/ws?token=old&v=2").unwrap();
        set_query_params(&mut url, &[("token", "new")]);
        assert_eq!(url.as_str(), "wss://portal.example.net/ws?v=2&token=new");
    }

    #[test]
    fn adds_query_to_bare_url() {
        let mut url = Url::parse("http://10.5.50.1/login").unwrap();
        set_query_params(&mut url, &[("username", "alice"), ("password", "p w")]);
        assert_eq!(url.as_str(), "http://10.5.50.1/login?username=alice&password=p+w");
    }
}
