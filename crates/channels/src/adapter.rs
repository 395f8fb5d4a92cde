use crate::{Result, event::ChannelEvent};

/// Translates one transport's raw inbound message into a [`ChannelEvent`].
///
/// Adapters are pure: they never dispatch, so each transport's parsing can
/// be tested without a running gateway.
pub trait ChannelAdapter {
    /// The raw message as the transport hands it over.
    type Inbound;

    /// Build an event, or fail with [`crate::Error::MalformedInput`].
    fn adapt(&self, inbound: Self::Inbound) -> Result<ChannelEvent>;
}

/// Read a string-ish field from a JSON object, accepting numbers too
/// (webhook senders are inconsistent about id types).
pub(crate) fn id_field<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    names: &[&str],
) -> Option<String> {
    names.iter().find_map(|name| match obj.get(*name)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
