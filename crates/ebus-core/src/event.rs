//! The addressed event.

use std::fmt;

/// An addressed message. Events are plain values and are copied at every hop.
///
/// `from` and `to` are address strings (see [`crate::Address`]); `data` is an
/// ordered, possibly empty, sequence of opaque fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Event {
    /// Sender address. Always overwritten by the server for inbound events.
    pub from: String,
    /// Destination address.
    pub to: String,
    /// Topic, or the group id for group control events.
    pub topic: String,
    /// Payload fields, order preserved end to end.
    pub data: Vec<String>,
}

impl Event {
    /// Build an event addressed to `to` with an empty `from`.
    pub fn new<I, S>(to: impl Into<String>, topic: impl Into<String>, data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            from: String::new(),
            to: to.into(),
            topic: topic.into(),
            data: data.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the sender address.
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    /// Build a reply travelling back to this event's sender.
    pub fn reply<I, S>(&self, from: impl Into<String>, topic: impl Into<String>, data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(self.from.clone(), topic, data).with_from(from)
    }

    /// Copy of this event re-addressed to `to`, keeping topic and data.
    #[must_use]
    pub fn readdressed(&self, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            topic: self.topic.clone(),
            data: self.data.clone(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}] {:?}", self.from, self.to, self.topic, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_empty_from() {
        let e = Event::new("&1", "hello", ["a", "b"]);
        assert!(e.from.is_empty());
        assert_eq!(e.to, "&1");
        assert_eq!(e.topic, "hello");
        assert_eq!(e.data, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn new_with_no_data() {
        let e = Event::new("@status", "agents", Vec::<String>::new());
        assert!(e.data.is_empty());
    }

    #[test]
    fn reply_targets_sender() {
        let req = Event::new("@status", "event_count", Vec::<String>::new()).with_from("&7");
        let resp = req.reply("@status", "event_count", ["3"]);
        assert_eq!(resp.from, "@status");
        assert_eq!(resp.to, "&7");
        assert_eq!(resp.data, vec!["3".to_string()]);
    }

    #[test]
    fn readdressed_keeps_payload() {
        let e = Event::new("@boardcast", "room", ["x"]).with_from("&1");
        let copy = e.readdressed("@boardcast", "&2");
        assert_eq!(copy.from, "@boardcast");
        assert_eq!(copy.to, "&2");
        assert_eq!(copy.topic, "room");
        assert_eq!(copy.data, e.data);
    }

    #[test]
    fn display_includes_route() {
        let e = Event::new("&2", "t", ["d"]).with_from("&1");
        let s = e.to_string();
        assert!(s.contains("&1 -> &2"));
        assert!(s.contains("[t]"));
    }
}
