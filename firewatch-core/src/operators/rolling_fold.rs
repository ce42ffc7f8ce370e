use crate::{
    channels::partition_io::Output,
    operators::{PartitionContext, StatefulLogic},
    types::{Data, DataMessage, Timestamp},
};

/// Folds every record of a key into a running accumulator and emits the accumulator
/// after each record.
///
/// The first record of a key becomes the accumulator as is. Every following record is
/// combined with `combine(&accumulator, record)`.
pub struct RollingFold<F> {
    combine: F,
}

impl<F> RollingFold<F> {
    /// Create a fold using the given combine function
    pub fn new(combine: F) -> Self {
        Self { combine }
    }
}

impl<K, V, T, F> StatefulLogic<K, V, T, Option<V>> for RollingFold<F>
where
    K: Clone,
    V: Data,
    T: Timestamp,
    F: FnMut(&V, V) -> V + 'static,
{
    type Output = V;

    fn on_data(
        &mut self,
        msg: DataMessage<K, V, T>,
        key_state: Option<V>,
        output: &mut Output<K, V, T>,
        _ctx: &mut PartitionContext,
    ) -> Option<Option<V>> {
        let folded = match key_state {
            Some(acc) => (self.combine)(&acc, msg.value),
            None => msg.value,
        };
        output.send(DataMessage::new(msg.key, folded.clone(), msg.timestamp).into());
        Some(Some(folded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        operators::{PartitionLogic, StatefulOp},
        sinks::VecSink,
        types::NoControl,
    };
    use proptest::prelude::*;

    fn add(acc: &i64, next: i64) -> i64 {
        acc + next
    }

    fn run(records: &[(u8, i64)]) -> Vec<(u8, i64)> {
        let sink: VecSink<DataMessage<u8, i64, usize>> = VecSink::new();
        let mut output: Output<u8, i64, usize> = Output::new(Box::new(sink.clone()), 0);
        let mut ctx = PartitionContext::new(0);
        let mut op = StatefulOp::new(RollingFold::new(add));
        for (i, (k, v)) in records.iter().enumerate() {
            PartitionLogic::<u8, i64, usize, NoControl>::on_data(
                &mut op,
                DataMessage::new(*k, *v, i),
                &mut output,
                &mut ctx,
            );
        }
        sink.into_iter().map(|m| (m.key, m.value)).collect()
    }

    #[test]
    fn first_record_is_emitted_as_is() {
        assert_eq!(run(&[(1, 5)]), vec![(1, 5)]);
    }

    #[test]
    fn sums_per_key() {
        assert_eq!(
            run(&[(1, 2), (2, 3), (2, 2), (1, 5)]),
            vec![(1, 2), (2, 3), (2, 5), (1, 7)]
        );
    }

    proptest! {
        #[test]
        fn emits_prefix_sums(records in prop::collection::vec((0u8..4, -1000i64..1000), 0..100)) {
            let out = run(&records);
            prop_assert_eq!(out.len(), records.len());
            for (i, (key, sum)) in out.iter().enumerate() {
                let expected: i64 = records[..=i].iter().filter(|r| r.0 == *key).map(|r| r.1).sum();
                prop_assert_eq!(*sum, expected);
                prop_assert_eq!(*key, records[i].0);
            }
        }
    }
}
