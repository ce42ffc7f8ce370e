use std::time::Instant;

use indexmap::IndexMap;
use tracing::debug;

use super::{PartitionContext, PartitionLogic};
use crate::{
    channels::partition_io::Output,
    types::{Data, DataMessage, Key},
};

/// Logic keeping one state value per key.
///
/// The state of a key is taken out of the partition's state map for every record and
/// handed to [StatefulLogic::on_data] by value. It is a fresh `S::default()` for keys
/// without state.
pub trait StatefulLogic<K, VI, T, S>: 'static {
    /// Value type emitted by this logic
    type Output: Data;

    /// Return Some to retain the key-state and None to discard it
    fn on_data(
        &mut self,
        msg: DataMessage<K, VI, T>,
        key_state: S,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) -> Option<S>;

    /// The frontier advanced, with mutable access to the state of all keys
    #[allow(unused)]
    fn on_epoch(
        &mut self,
        epoch: &T,
        state: &mut IndexMap<K, S>,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
    }

    /// Called periodically by the partition loop
    #[allow(unused)]
    fn on_schedule(
        &mut self,
        now: Instant,
        state: &mut IndexMap<K, S>,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
    }
}

/// Runs a [StatefulLogic] in a partition, owning the partition's keyed state
pub struct StatefulOp<L, K, S> {
    logic: L,
    state: IndexMap<K, S>,
}

impl<L, K, S> StatefulOp<L, K, S> {
    /// Create an operator with empty state
    pub fn new(logic: L) -> Self {
        Self {
            logic,
            state: IndexMap::new(),
        }
    }

    /// The keyed state currently held
    pub fn state(&self) -> &IndexMap<K, S> {
        &self.state
    }
}

impl<L, K, V, T, C, S> PartitionLogic<K, V, T, C> for StatefulOp<L, K, S>
where
    L: StatefulLogic<K, V, T, S>,
    K: Key,
    S: Default + 'static,
{
    type Output = L::Output;

    fn on_data(
        &mut self,
        msg: DataMessage<K, V, T>,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
        let key = msg.key.clone();
        let key_state = self.state.swap_remove(&key).unwrap_or_default();
        if let Some(n) = self.logic.on_data(msg, key_state, output, ctx) {
            self.state.insert(key, n);
        }
    }

    fn on_epoch(
        &mut self,
        epoch: &T,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
        self.logic.on_epoch(epoch, &mut self.state, output, ctx);
    }

    fn on_schedule(
        &mut self,
        now: Instant,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
        self.logic.on_schedule(now, &mut self.state, output, ctx);
    }

    fn on_abort(&mut self, ctx: &mut PartitionContext) {
        debug!(
            partition = ctx.partition,
            keys = self.state.len(),
            "discarding keyed state"
        );
        self.state.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sinks::VecSink, types::NoControl};

    /// Counts records per key and emits the running count
    struct Counter;

    impl StatefulLogic<String, i32, i64, u32> for Counter {
        type Output = u32;

        fn on_data(
            &mut self,
            msg: DataMessage<String, i32, i64>,
            key_state: u32,
            output: &mut Output<String, u32, i64>,
            _ctx: &mut PartitionContext,
        ) -> Option<u32> {
            let count = key_state + 1;
            output.send(DataMessage::new(msg.key, count, msg.timestamp).into());
            // forget the key after three records
            (count < 3).then_some(count)
        }
    }

    #[test]
    fn keeps_state_per_key() {
        let sink: VecSink<DataMessage<String, u32, i64>> = VecSink::new();
        let mut output: Output<String, u32, i64> = Output::new(Box::new(sink.clone()), 0);
        let mut ctx = PartitionContext::new(0);
        let mut op = StatefulOp::new(Counter);

        for key in ["a", "b", "a", "a", "a"] {
            PartitionLogic::<String, i32, i64, NoControl>::on_data(
                &mut op,
                DataMessage::new(key.to_owned(), 0, 0),
                &mut output,
                &mut ctx,
            );
        }
        let counts: Vec<_> = sink.into_iter().map(|m| (m.key, m.value)).collect();
        assert_eq!(
            counts,
            vec![
                ("a".to_owned(), 1),
                ("b".to_owned(), 1),
                ("a".to_owned(), 2),
                ("a".to_owned(), 3),
                ("a".to_owned(), 1),
            ]
        );
        assert_eq!(op.state().get("a"), Some(&1));
    }

    #[test]
    fn abort_discards_state() {
        let mut ctx = PartitionContext::new(0);
        let sink: VecSink<DataMessage<String, u32, i64>> = VecSink::new();
        let mut output: Output<String, u32, i64> = Output::new(Box::new(sink), 0);
        let mut op = StatefulOp::new(Counter);
        PartitionLogic::<String, i32, i64, NoControl>::on_data(
            &mut op,
            DataMessage::new("a".to_owned(), 0, 0),
            &mut output,
            &mut ctx,
        );
        PartitionLogic::<String, i32, i64, NoControl>::on_abort(&mut op, &mut ctx);
        assert!(op.state().is_empty());
    }
}
