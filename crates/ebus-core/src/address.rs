//! Address families, told apart by their first character.

/// Prefix of connected agent addresses (`&1`, `&2`, ...).
pub const AGENT_PREFIX: char = '&';
/// Prefix of service addresses (`@join`, `@record`, ...).
pub const SERVICE_PREFIX: char = '@';

/// A destination resolved once, before routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Address<'a> {
    /// A connected agent; holds the full address including the `&` prefix.
    Agent(&'a str),
    /// A service; holds the name without the `@` prefix.
    Service(&'a str),
    /// A group id. Valid as a join/leave/broadcast topic, never as a destination.
    Group(&'a str),
    /// The empty address.
    Invalid,
}

impl<'a> Address<'a> {
    /// Classify a raw address string.
    pub fn parse(raw: &'a str) -> Self {
        match raw.chars().next() {
            None => Self::Invalid,
            Some(AGENT_PREFIX) => Self::Agent(raw),
            Some(SERVICE_PREFIX) => Self::Service(&raw[SERVICE_PREFIX.len_utf8()..]),
            Some(_) => Self::Group(raw),
        }
    }
}

/// Format the agent address for a numeric id.
pub fn agent_address(id: u64) -> String {
    format!("{AGENT_PREFIX}{id}")
}

/// Format the service address for a service name.
pub fn service_address(name: &str) -> String {
    format!("{SERVICE_PREFIX}{name}")
}

/// Numeric id of an agent address, if it is one.
pub fn agent_id(raw: &str) -> Option<u64> {
    raw.strip_prefix(AGENT_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_agent() {
        assert_eq!(Address::parse("&12"), Address::Agent("&12"));
    }

    #[test]
    fn parse_service_strips_prefix() {
        assert_eq!(Address::parse("@join"), Address::Service("join"));
        assert_eq!(Address::parse("@"), Address::Service(""));
    }

    #[test]
    fn parse_group() {
        assert_eq!(Address::parse("room"), Address::Group("room"));
        assert_eq!(Address::parse("#clip"), Address::Group("#clip"));
    }

    #[test]
    fn parse_empty_is_invalid() {
        assert_eq!(Address::parse(""), Address::Invalid);
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(agent_address(3), "&3");
        assert_eq!(service_address("record"), "@record");
    }

    #[test]
    fn agent_id_parses_numeric_suffix() {
        assert_eq!(agent_id("&42"), Some(42));
        assert_eq!(agent_id("@42"), None);
        assert_eq!(agent_id("&x"), None);
    }
}
