use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, error, info, span, Level};

use super::{ShutdownMode, ShutdownSignal};
use crate::{
    channels::partition_io::{Input, Output, Received},
    operators::{PartitionContext, PartitionLogic, PartitionMetrics},
    sinks::StatelessSinkImpl,
    sources::SourceError,
    types::{EventTime, Message, PartitionIndex, SourceId},
};

/// A partition stopped abnormally
#[derive(Debug, Error)]
pub enum PartitionError {
    /// An upstream source failed
    #[error("upstream source {source_id} failed")]
    SourceFailed {
        /// The failed source
        source_id: SourceId,
        /// What went wrong
        #[source]
        error: Arc<SourceError>,
    },
}

/// The single threaded processing loop of one partition.
///
/// The loop owns the partition's logic and all of its state. It takes one message at a
/// time off the partition's input queue and dispatches it to the logic, so data and
/// control events are handled strictly sequentially in arrival order.
pub struct PartitionLoop<K, V, C, L: PartitionLogic<K, V, EventTime, C>> {
    logic: L,
    input: Input<K, V, EventTime, C>,
    output: Output<K, L::Output, EventTime>,
    ctx: PartitionContext,
    shutdown: ShutdownSignal,
    tick: Duration,
}

impl<K, V, C, L> PartitionLoop<K, V, C, L>
where
    L: PartitionLogic<K, V, EventTime, C>,
{
    /// Create the loop of `partition`
    pub fn new(
        partition: PartitionIndex,
        logic: L,
        input: Input<K, V, EventTime, C>,
        sink: Box<dyn StatelessSinkImpl<K, L::Output, EventTime>>,
        shutdown: ShutdownSignal,
        tick: Duration,
    ) -> Self {
        Self {
            logic,
            input,
            output: Output::new(sink, partition),
            ctx: PartitionContext::new(partition),
            shutdown,
            tick,
        }
    }

    /// Run until all sources finished, a source failed or a shutdown is requested
    pub fn run(mut self) -> Result<PartitionMetrics, PartitionError> {
        let span = span!(Level::INFO, "partition", partition = self.ctx.partition);
        let _guard = span.enter();
        info!("starting partition");

        let mut last_tick = Instant::now();
        loop {
            match self.shutdown.requested() {
                Some(ShutdownMode::Abort) => {
                    info!("aborting, pending windows are discarded");
                    self.logic.on_abort(&mut self.ctx);
                    break;
                }
                Some(ShutdownMode::Graceful) => {
                    info!("shutting down gracefully");
                    self.drain()?;
                    self.final_epoch();
                    break;
                }
                None => (),
            }

            let timeout = self.tick.saturating_sub(last_tick.elapsed());
            match self.input.recv(timeout) {
                Received::Closed => {
                    debug!("all sources finished");
                    self.final_epoch();
                    break;
                }
                received => self.dispatch(received)?,
            }

            if last_tick.elapsed() >= self.tick {
                let now = Instant::now();
                self.logic.on_schedule(now, &mut self.output, &mut self.ctx);
                last_tick = now;
            }
        }

        self.ctx.metrics.emitted = self.output.emitted();
        info!(metrics = ?self.ctx.metrics, "partition finished");
        Ok(self.ctx.metrics)
    }

    fn dispatch(&mut self, received: Received<K, V, EventTime, C>) -> Result<(), PartitionError> {
        match received {
            Received::Data(msg) => {
                self.ctx.metrics.processed += 1;
                self.logic.on_data(msg, &mut self.output, &mut self.ctx);
            }
            Received::Control(event) => {
                self.ctx.metrics.control_events += 1;
                self.logic.on_control(event, &mut self.output, &mut self.ctx);
            }
            Received::Epoch(epoch) => {
                self.logic.on_epoch(&epoch, &mut self.output, &mut self.ctx);
                self.output.send(Message::Epoch(epoch));
            }
            Received::Fault { source_id, error } => {
                error!(source_id, error = %error, "upstream source failed, stopping partition");
                self.logic.on_abort(&mut self.ctx);
                return Err(PartitionError::SourceFailed { source_id, error });
            }
            Received::Idle | Received::Closed => (),
        }
        Ok(())
    }

    /// Process everything already queued
    fn drain(&mut self) -> Result<(), PartitionError> {
        loop {
            match self.input.recv(Duration::ZERO) {
                Received::Closed => return Ok(()),
                Received::Idle if self.input.is_empty() => return Ok(()),
                received => self.dispatch(received)?,
            }
        }
    }

    /// Fire everything still pending by advancing to the end of time
    fn final_epoch(&mut self) {
        if self.output.frontier() == Some(&EventTime::MAX) {
            return;
        }
        self.logic
            .on_epoch(&EventTime::MAX, &mut self.output, &mut self.ctx);
        self.output.send(Message::Epoch(EventTime::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channels::partition_io::{bounded, PartitionInput},
        config::TimeCharacteristic,
        operators::{
            window::{Average, KeyWindows, WindowAggregator},
            StatefulOp,
        },
        runtime::RuntimeHandle,
        sinks::VecSink,
        types::{DataMessage, NoControl},
    };

    type Averages = StatefulOp<WindowAggregator<Average>, String, KeyWindows<Average>>;

    /// Window averages which request an abort as soon as they buffered a record
    struct AbortAfterData {
        inner: Averages,
        handle: RuntimeHandle,
    }

    impl PartitionLogic<String, f64, EventTime, NoControl> for AbortAfterData {
        type Output = f64;

        fn on_data(
            &mut self,
            msg: DataMessage<String, f64, EventTime>,
            output: &mut Output<String, f64, EventTime>,
            ctx: &mut PartitionContext,
        ) {
            PartitionLogic::<String, f64, EventTime, NoControl>::on_data(
                &mut self.inner,
                msg,
                output,
                ctx,
            );
            self.handle.shutdown(ShutdownMode::Abort);
        }

        fn on_epoch(
            &mut self,
            epoch: &EventTime,
            output: &mut Output<String, f64, EventTime>,
            ctx: &mut PartitionContext,
        ) {
            PartitionLogic::<String, f64, EventTime, NoControl>::on_epoch(
                &mut self.inner,
                epoch,
                output,
                ctx,
            );
        }

        fn on_abort(&mut self, ctx: &mut PartitionContext) {
            PartitionLogic::<String, f64, EventTime, NoControl>::on_abort(&mut self.inner, ctx);
        }
    }

    #[test]
    fn abort_discards_open_windows() {
        let handle = RuntimeHandle::default();
        let (tx, input) = bounded::<String, f64, EventTime, NoControl>(8, [0], [0]);
        let never = ShutdownSignal::never();
        tx.send(
            PartitionInput::Data(DataMessage::new("a".to_owned(), 1.0, 0)),
            &never,
        )
        .unwrap();
        // would fire everything if the loop got to it
        tx.send(PartitionInput::Finished { source_id: 0 }, &never)
            .unwrap();

        let sink: VecSink<DataMessage<String, f64, EventTime>> = VecSink::new();
        let logic = AbortAfterData {
            inner: StatefulOp::new(WindowAggregator::new(5000, TimeCharacteristic::EventTime)),
            handle: handle.clone(),
        };
        let metrics = PartitionLoop::new(
            0,
            logic,
            input,
            Box::new(sink.clone()),
            handle.signal(),
            Duration::from_secs(3600),
        )
        .run()
        .unwrap();

        assert_eq!(metrics.processed, 1);
        assert_eq!(metrics.emitted, 0);
        assert!(sink.is_empty());
    }
}
