use crate::{
    channels::partition_io::Output,
    operators::{PartitionContext, PartitionLogic},
    types::{Data, DataMessage},
};

/// Logic combining a keyed primary stream with a broadcast control stream.
///
/// Both handlers operate on the same instance and are never invoked concurrently. They
/// see records and control events in the arrival order of the partition, which may
/// differ between partitions.
pub trait CoLogic<K, V, T, C>: 'static {
    /// Value type emitted by this logic
    type Output: Data;

    /// Handle a record of the primary stream
    fn on_primary(
        &mut self,
        msg: DataMessage<K, V, T>,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    );

    /// Handle an event of the control stream
    fn on_control(&mut self, event: C, ctx: &mut PartitionContext);
}

/// Runs a [CoLogic] in a partition
pub struct Correlator<L>(L);

impl<L> Correlator<L> {
    /// Wrap the given logic
    pub fn new(logic: L) -> Self {
        Self(logic)
    }

    /// The wrapped logic
    pub fn logic(&self) -> &L {
        &self.0
    }
}

impl<K, V, T, C, L> PartitionLogic<K, V, T, C> for Correlator<L>
where
    L: CoLogic<K, V, T, C>,
{
    type Output = L::Output;

    fn on_data(
        &mut self,
        msg: DataMessage<K, V, T>,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
        self.0.on_primary(msg, output, ctx);
    }

    fn on_control(
        &mut self,
        event: C,
        _output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
        self.0.on_control(event, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::VecSink;

    /// Emits records only while the gate is open
    #[derive(Default)]
    struct Gate {
        open: bool,
    }

    impl CoLogic<u8, i32, i64, bool> for Gate {
        type Output = i32;

        fn on_primary(
            &mut self,
            msg: DataMessage<u8, i32, i64>,
            output: &mut Output<u8, i32, i64>,
            _ctx: &mut PartitionContext,
        ) {
            if self.open {
                output.send(msg.into());
            }
        }

        fn on_control(&mut self, event: bool, _ctx: &mut PartitionContext) {
            self.open = event;
        }
    }

    #[test]
    fn control_applies_to_following_records_only() {
        let sink: VecSink<DataMessage<u8, i32, i64>> = VecSink::new();
        let mut output: Output<u8, i32, i64> = Output::new(Box::new(sink.clone()), 0);
        let mut ctx = PartitionContext::new(0);
        let mut op = Correlator::new(Gate::default());

        type Logic = dyn PartitionLogic<u8, i32, i64, bool, Output = i32>;
        let op_ref: &mut Logic = &mut op;
        op_ref.on_data(DataMessage::new(0, 1, 0), &mut output, &mut ctx);
        op_ref.on_control(true, &mut output, &mut ctx);
        op_ref.on_data(DataMessage::new(0, 2, 1), &mut output, &mut ctx);
        op_ref.on_control(false, &mut output, &mut ctx);
        op_ref.on_data(DataMessage::new(0, 3, 2), &mut output, &mut ctx);

        let values: Vec<_> = sink.into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec![2]);
        assert!(!op.logic().open);
    }
}
