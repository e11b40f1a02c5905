use crate::types::{Brightness, ChannelId};

/// Current brightness of every configured channel.
///
/// The key set is fixed at construction and values are always in range, so
/// callers can only update channels that already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    entries: Vec<(ChannelId, Brightness)>,
}

impl ChannelState {
    pub fn new(channels: impl IntoIterator<Item = ChannelId>) -> Self {
        let mut entries: Vec<(ChannelId, Brightness)> = Vec::new();
        for id in channels {
            if !entries.iter().any(|(existing, _)| *existing == id) {
                entries.push((id, Brightness::OFF));
            }
        }
        Self { entries }
    }

    pub fn get(&self, channel: &ChannelId) -> Option<Brightness> {
        self.entries
            .iter()
            .find(|(id, _)| id == channel)
            .map(|(_, brightness)| *brightness)
    }

    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.get(channel).is_some()
    }

    /// Returns the previous value, or `None` when the channel is unknown and
    /// nothing was written.
    pub fn set(&mut self, channel: &ChannelId, brightness: Brightness) -> Option<Brightness> {
        let (_, slot) = self.entries.iter_mut().find(|(id, _)| id == channel)?;
        Some(std::mem::replace(slot, brightness))
    }

    pub fn first_channel(&self) -> Option<&ChannelId> {
        self.entries.first().map(|(id, _)| id)
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, Brightness)> {
        self.entries.iter().map(|(id, brightness)| (id, *brightness))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn three_channels() -> ChannelState {
        ChannelState::new(["1", "2", "3"].map(ChannelId::from))
    }

    #[test]
    fn starts_with_every_channel_off() {
        let state = three_channels();

        assert_eq!(state.len(), 3);
        assert!(state.iter().all(|(_, brightness)| brightness == Brightness::OFF));
        assert_eq!(state.first_channel(), Some(&ChannelId::from("1")));
    }

    #[test]
    fn set_only_touches_known_channels() {
        let mut state = three_channels();

        assert_eq!(
            state.set(&ChannelId::from("2"), Brightness::clamped(55)),
            Some(Brightness::OFF)
        );
        assert_eq!(state.set(&ChannelId::from("9"), Brightness::FULL), None);

        let values: Vec<u8> = state.iter().map(|(_, b)| b.percent()).collect();
        assert_eq!(values, vec![0, 55, 0]);
        assert!(!state.contains(&ChannelId::from("9")));
    }

    #[test]
    fn duplicate_ids_collapse_keeping_order() {
        let state = ChannelState::new(["b", "a", "b"].map(ChannelId::from));
        let ids: Vec<&str> = state.channel_ids().map(ChannelId::as_str).collect();

        assert_eq!(ids, vec!["b", "a"]);
    }
}
