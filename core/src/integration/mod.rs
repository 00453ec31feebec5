//! Integration tests for the recorder
//!
//! Drives full record → replay cycles through the session manager, against
//! both the in-memory and the file-system log store.


#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use crate::config::TimingConfig;
    use crate::live::SharedInput;
    use crate::log_store::LogStore;
    use crate::session::SessionManager;
    use crate::snapshot::ChannelShape;
    use crate::{ChannelId, InputSnapshot};

    /// 2 axes / 1 button
    pub const SHAPE: ChannelShape = ChannelShape::new(2, 1);

    /// Manager with a single "drive" channel fed by the returned input slot
    pub fn single_channel(store: Arc<dyn LogStore>) -> (SessionManager, ChannelId, SharedInput) {
        let live = SharedInput::new();
        let mut manager = SessionManager::new(store, &TimingConfig::default());
        let id = manager
            .add_channel("drive", SHAPE, Box::new(live.clone()))
            .unwrap();
        (manager, id, live)
    }

    /// Publish `value` to the live input, tick once, and return what the channel saw
    pub fn tick_with(
        manager: &mut SessionManager,
        id: ChannelId,
        live: &SharedInput,
        value: InputSnapshot,
    ) -> InputSnapshot {
        live.set(value);
        manager.tick();
        manager.channel(id).unwrap().current().clone()
    }

    /// Distinct snapshot per index
    pub fn sample(i: usize) -> InputSnapshot {
        InputSnapshot::new(
            [(i % 10) as f32 / 10.0, -((i % 7) as f32) / 10.0],
            [i % 2 == 1],
        )
    }
}
