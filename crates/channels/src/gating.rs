use inlet_protocol::channel_pattern_matches;

/// Whether `channel_id` passes the configured allow-list.
///
/// An empty list allows every channel. Entries match exactly or as
/// `*`-wildcard patterns (`slack-*`, `*-webhook`).
pub fn is_allowed(channel_id: &str, allowlist: &[String]) -> bool {
    allowlist.is_empty()
        || allowlist
            .iter()
            .any(|pattern| channel_pattern_matches(pattern, channel_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_allowlist_allows_everything() {
        assert!(is_allowed("anything", &[]));
    }

    #[test]
    fn exact_match() {
        let allowed = list(&["web", "cli"]);
        assert!(is_allowed("web", &allowed));
        assert!(!is_allowed("webhook", &allowed));
        assert!(!is_allowed("sms", &allowed));
    }

    #[test]
    fn prefix_wildcard() {
        let allowed = list(&["slack-*"]);
        assert!(is_allowed("slack-team", &allowed));
        assert!(is_allowed("slack-", &allowed));
        assert!(!is_allowed("discord-team", &allowed));
    }

    #[test]
    fn suffix_wildcard() {
        let allowed = list(&["*-webhook"]);
        assert!(is_allowed("github-webhook", &allowed));
        assert!(!is_allowed("github-poll", &allowed));
    }

    #[test]
    fn inner_wildcards() {
        let allowed = list(&["team_*_*_prod"]);
        assert!(is_allowed("team_a_b_prod", &allowed));
        assert!(!is_allowed("team_a_b_dev", &allowed));
    }

    #[test]
    fn lone_star_matches_all() {
        assert!(is_allowed("x", &list(&["*"])));
    }
}
