//! Message-bus topic constants.
//!
//! Static templates consumed by the publisher; the configuration core never
//! computes or publishes topics itself. Wildcard topics are subscription
//! filters, suffix constants are appended to a per-device prefix.

/// Prefix for device twin event topics.
pub const DEFAULT_TOPIC_PREFIX: &str = "$hw/events/device/";

/// Prefix for direct device topics.
pub const DEFAULT_DIRECT_TOPIC_PREFIX: &str = "$hw/devices/";

/// Subscription filter for twin delta updates.
pub const TWIN_DELTA_TOPIC: &str = "$hw/events/device/+/twin/update/delta";

/// Suffix for twin state updates.
pub const TWIN_UPDATE_TOPIC: &str = "/twin/update";

/// Subscription filter for twin get results.
pub const TWIN_GET_RES_TOPIC: &str = "$hw/events/device/+/twin/get/result";

/// Suffix for twin state reads.
pub const TWIN_GET_TOPIC: &str = "/twin/get";

/// Suffix for direct property reads.
pub const DIRECT_GET_TOPIC: &str = "/events/properties/get";

/// Prefix for device data topics.
pub const DEFAULT_DATA_TOPIC_PREFIX: &str = "$ke/events/device/";

/// Suffix for device data updates.
pub const DATA_UPDATE_TOPIC: &str = "/data/update";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_filters_extend_the_event_prefix() {
        assert!(TWIN_DELTA_TOPIC.starts_with(DEFAULT_TOPIC_PREFIX));
        assert!(TWIN_GET_RES_TOPIC.starts_with(DEFAULT_TOPIC_PREFIX));
    }
}
