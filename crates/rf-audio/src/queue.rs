//! Single-producer / single-consumer feature queue.
//!
//! Wraps `rtrb`'s lock-free ring buffer with an EOF flag, since `rtrb` itself
//! has no notion of stream closure or a blocking receive. The consumer
//! side's `recv` spins briefly between polls rather than blocking on a
//! condvar, trading a little CPU for zero allocation on the hot path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rf_core::ChromaVector;
use rtrb::{Consumer, Producer, RingBuffer};

/// One feature-queue item: a chroma (or chroma-decay) vector stamped with
/// the monotonic time it was produced.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFrame {
    pub chroma: ChromaVector,
    pub stamp: Instant,
}

/// Result of a consumer dequeue.
#[derive(Debug)]
pub enum QueueItem {
    Frame(FeatureFrame),
    Eof,
}

/// Producer half of the feature queue. Dropped (or its `Source`) when
/// production ends; callers must call [`FeatureProducer::close`] to signal
/// EOF explicitly, since drop order isn't observable by the consumer.
pub struct FeatureProducer {
    inner: Producer<FeatureFrame>,
    eof: Arc<AtomicBool>,
}

impl FeatureProducer {
    /// Pushes one frame. Silently drops the frame if the queue is full;
    /// the queue is unbounded in the steady-state sense the design assumes
    /// (the consumer always keeps pace), so a full queue only happens under
    /// pathological backpressure and dropping one frame is preferable to
    /// blocking the producer thread.
    pub fn push(&mut self, chroma: ChromaVector) {
        let frame = FeatureFrame {
            chroma,
            stamp: Instant::now(),
        };
        let _ = self.inner.push(frame);
    }

    /// Signals end-of-stream to the consumer.
    pub fn close(&self) {
        self.eof.store(true, Ordering::Release);
    }

    /// A cloneable handle that can signal EOF after this producer has been
    /// moved into a device callback closure.
    pub fn eof_handle(&self) -> EofSignal {
        EofSignal(self.eof.clone())
    }
}

/// Detached handle to a feature queue's EOF flag.
#[derive(Clone)]
pub struct EofSignal(Arc<AtomicBool>);

impl EofSignal {
    pub fn close(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Consumer half of the feature queue.
pub struct FeatureConsumer {
    inner: Consumer<FeatureFrame>,
    eof: Arc<AtomicBool>,
}

impl FeatureConsumer {
    /// Blocks until a frame is available or the producer signals EOF.
    pub fn recv(&mut self) -> QueueItem {
        loop {
            match self.inner.pop() {
                Ok(frame) => return QueueItem::Frame(frame),
                Err(_) => {
                    if self.eof.load(Ordering::Acquire) && self.inner.is_empty() {
                        return QueueItem::Eof;
                    }
                    thread::sleep(Duration::from_micros(200));
                }
            }
        }
    }

    pub fn is_eof(&self) -> bool {
        self.eof.load(Ordering::Acquire) && self.inner.is_empty()
    }
}

/// Creates a producer/consumer pair backed by a ring buffer of `capacity`
/// slots. Capacity only bounds the worst-case lag between producer and
/// consumer; steady state keeps it nearly empty.
pub fn channel(capacity: usize) -> (FeatureProducer, FeatureConsumer) {
    let (producer, consumer) = RingBuffer::new(capacity);
    let eof = Arc::new(AtomicBool::new(false));
    (
        FeatureProducer {
            inner: producer,
            eof: eof.clone(),
        },
        FeatureConsumer {
            inner: consumer,
            eof,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_frames_in_order() {
        let (mut producer, mut consumer) = channel(16);
        producer.push([1.0; 12]);
        producer.push([2.0; 12]);

        match consumer.recv() {
            QueueItem::Frame(f) => assert_eq!(f.chroma, [1.0; 12]),
            QueueItem::Eof => panic!("expected a frame"),
        }
        match consumer.recv() {
            QueueItem::Frame(f) => assert_eq!(f.chroma, [2.0; 12]),
            QueueItem::Eof => panic!("expected a frame"),
        }
    }

    #[test]
    fn reports_eof_once_drained() {
        let (mut producer, mut consumer) = channel(16);
        producer.push([1.0; 12]);
        producer.close();

        assert!(matches!(consumer.recv(), QueueItem::Frame(_)));
        assert!(matches!(consumer.recv(), QueueItem::Eof));
    }
}
