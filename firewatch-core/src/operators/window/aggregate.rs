use std::{
    marker::PhantomData,
    time::{Duration, Instant},
};

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use tracing::debug;

use super::{TumblingWindows, Window};
use crate::{
    channels::partition_io::Output,
    config::TimeCharacteristic,
    operators::{PartitionContext, StatefulLogic},
    types::{Data, DataMessage, EventTime, Key, Message},
};

/// Incrementally aggregates the values of one window
pub trait WindowAccumulator<V>: Default + 'static {
    /// Result of the aggregation
    type Output: Data;

    /// Add a value to the window
    fn add(&mut self, value: V);

    /// Number of values added
    fn count(&self) -> u64;

    /// Final result. Only ever called on accumulators with at least one value.
    fn finish(self) -> Self::Output;
}

/// Arithmetic mean
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Average {
    count: u64,
    sum: f64,
}

impl WindowAccumulator<f64> for Average {
    type Output = f64;

    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn finish(self) -> f64 {
        self.sum / self.count as f64
    }
}

/// The accumulator of one (key, window) pair
#[derive(Debug, Clone)]
pub struct WindowBuffer<A> {
    /// Values aggregated so far
    pub accumulator: A,
    /// Wall clock time the first value arrived
    pub created: Instant,
}

impl<A: Default> WindowBuffer<A> {
    fn new() -> Self {
        Self {
            accumulator: A::default(),
            created: Instant::now(),
        }
    }
}

/// State of one key: the open windows and the windows which already fired
#[derive(Debug, Clone)]
pub struct KeyWindows<A> {
    buffers: IndexMap<Window, WindowBuffer<A>>,
    // only tracked in processing time mode, where windows fire out of start order
    fired: IndexSet<Window>,
}

impl<A> Default for KeyWindows<A> {
    fn default() -> Self {
        Self {
            buffers: IndexMap::new(),
            fired: IndexSet::new(),
        }
    }
}

impl<A> KeyWindows<A> {
    /// Windows currently accumulating
    pub fn open_windows(&self) -> impl Iterator<Item = &Window> {
        self.buffers.keys()
    }

    /// Remove all buffers matching `ready`, ordered by window start
    fn take_where(
        &mut self,
        mut ready: impl FnMut(&Window, &WindowBuffer<A>) -> bool,
    ) -> Vec<(Window, A)> {
        let windows = self
            .buffers
            .iter()
            .filter(|(w, b)| ready(w, b))
            .map(|(w, _)| *w)
            .sorted()
            .collect_vec();
        let mut fired = Vec::with_capacity(windows.len());
        for window in windows {
            if let Some(buffer) = self.buffers.swap_remove(&window) {
                fired.push((window, buffer.accumulator));
            }
        }
        fired
    }
}

/// Tumbling window aggregation per key.
///
/// Buffers are created with the first record of a (key, window) pair and destroyed when
/// the window fires, so a window never fires twice and never fires empty.
///
/// - In event time mode a window fires once the frontier reaches its end.
/// - In processing time mode a window fires once its buffer exists for longer than
///   the window size on the wall clock. A final epoch of `EventTime::MAX` fires all windows
///   in both modes.
///
/// Records for windows which already fired are dropped and counted as late.
pub struct WindowAggregator<A> {
    windows: TumblingWindows,
    trigger: TimeCharacteristic,
    frontier: Option<EventTime>,
    _accumulator: PhantomData<fn() -> A>,
}

impl<A> WindowAggregator<A> {
    /// Aggregate into windows of `size` milliseconds
    pub fn new(size: EventTime, trigger: TimeCharacteristic) -> Self {
        Self {
            windows: TumblingWindows::new(size),
            trigger,
            frontier: None,
            _accumulator: PhantomData,
        }
    }

    fn is_late(&self, window: &Window, key_state: &KeyWindows<A>) -> bool {
        match self.trigger {
            TimeCharacteristic::EventTime => self.frontier.is_some_and(|f| window.end <= f),
            TimeCharacteristic::ProcessingTime => key_state.fired.contains(window),
        }
    }
}

/// Key state must outlive its buffers in processing time mode to remember what fired
fn is_discardable<A>(key_state: &KeyWindows<A>, trigger: TimeCharacteristic) -> bool {
    key_state.buffers.is_empty()
        && (trigger == TimeCharacteristic::EventTime || key_state.fired.is_empty())
}

fn fire<K: Clone, V, A: WindowAccumulator<V>>(
    key: &K,
    fired: Vec<(Window, A)>,
    output: &mut Output<K, A::Output, EventTime>,
    ctx: &PartitionContext,
) {
    for (window, accumulator) in fired {
        debug_assert!(accumulator.count() > 0);
        debug!(
            partition = ctx.partition,
            window_start = window.start,
            window_end = window.end,
            count = accumulator.count(),
            "firing window"
        );
        output.send(Message::Data(DataMessage::new(
            key.clone(),
            accumulator.finish(),
            window.end,
        )));
    }
}

impl<K, V, A> StatefulLogic<K, V, EventTime, KeyWindows<A>> for WindowAggregator<A>
where
    K: Key,
    A: WindowAccumulator<V>,
{
    type Output = A::Output;

    fn on_data(
        &mut self,
        msg: DataMessage<K, V, EventTime>,
        mut key_state: KeyWindows<A>,
        _output: &mut Output<K, A::Output, EventTime>,
        ctx: &mut PartitionContext,
    ) -> Option<KeyWindows<A>> {
        let window = self.windows.window_for(msg.timestamp);
        if self.is_late(&window, &key_state) {
            ctx.metrics.late_dropped += 1;
            debug!(
                key = ?msg.key,
                timestamp = msg.timestamp,
                window_end = window.end,
                "dropping late record"
            );
        } else {
            key_state
                .buffers
                .entry(window)
                .or_insert_with(WindowBuffer::new)
                .accumulator
                .add(msg.value);
        }
        (!is_discardable(&key_state, self.trigger)).then_some(key_state)
    }

    fn on_epoch(
        &mut self,
        epoch: &EventTime,
        state: &mut IndexMap<K, KeyWindows<A>>,
        output: &mut Output<K, A::Output, EventTime>,
        ctx: &mut PartitionContext,
    ) {
        self.frontier = Some(self.frontier.map_or(*epoch, |f| f.max(*epoch)));
        let trigger = self.trigger;
        if trigger == TimeCharacteristic::ProcessingTime && *epoch != EventTime::MAX {
            return;
        }
        let frontier = *epoch;
        state.retain(|key, windows| {
            let fired = windows.take_where(|w, _| w.end <= frontier);
            fire::<K, V, A>(key, fired, output, ctx);
            !is_discardable(windows, trigger)
        });
    }

    fn on_schedule(
        &mut self,
        now: Instant,
        state: &mut IndexMap<K, KeyWindows<A>>,
        output: &mut Output<K, A::Output, EventTime>,
        ctx: &mut PartitionContext,
    ) {
        if self.trigger != TimeCharacteristic::ProcessingTime {
            return;
        }
        let size = Duration::from_millis(self.windows.size().unsigned_abs());
        state.retain(|key, windows| {
            let fired = windows.take_where(|_, b| now.saturating_duration_since(b.created) >= size);
            windows.fired.extend(fired.iter().map(|(w, _)| *w));
            fire::<K, V, A>(key, fired, output, ctx);
            !is_discardable(windows, TimeCharacteristic::ProcessingTime)
        });
    }
}
