//! Sensor tasks
//!
//! Each sensor runs on its own tokio task and hands samples to the
//! acquisition loop through a channel of capacity one, so a slow consumer
//! holds the generator back instead of letting samples pile up.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::sensors::{SensorData, SensorGenerator, SensorType};

/// Receiving end of a running sensor task
pub struct SensorStream {
    pub sensor_type: SensorType,
    pub receiver: mpsc::Receiver<SensorData>,
    pub handle: JoinHandle<()>,
}

/// Start `generator` on a background task
///
/// The task samples once per period and exits when `token` is cancelled or
/// the receiver is dropped. A failed sample is logged and the tick skipped.
pub fn spawn_sensor(mut generator: SensorGenerator, token: CancellationToken) -> SensorStream {
    let (tx, receiver) = mpsc::channel(1);
    let sensor_type = generator.sensor_type();
    let period = generator.period();

    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(sensor = %sensor_type, ?period, "sensor started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {},
            }

            let data = match generator.next_sample() {
                Ok(data) => data,
                Err(e) => {
                    warn!(sensor = %sensor_type, "Error reading {}: {}", sensor_type, e);
                    continue;
                },
            };

            tokio::select! {
                _ = token.cancelled() => break,
                sent = tx.send(data) => {
                    if sent.is_err() {
                        break;
                    }
                },
            }
        }

        debug!(sensor = %sensor_type, "sensor stopped");
    });

    SensorStream {
        sensor_type,
        receiver,
        handle,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::core::config::SensorConfig;
    use crate::core::processor::ReferenceValues;
    use std::time::Duration;

    fn generator(equation: &str) -> SensorGenerator {
        let config = SensorConfig {
            frequency_hz: 10,
            resolution_bits: 8,
            equation: equation.to_string(),
            ..Default::default()
        };
        SensorGenerator::new(SensorType::Flow, &config, ReferenceValues::default(), 1).unwrap()
    }

    #[tokio::test]
    async fn test_emits_within_one_second() {
        let token = CancellationToken::new();
        let mut stream = spawn_sensor(generator("50"), token.clone());

        let data = tokio::time::timeout(Duration::from_secs(1), stream.receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.sensor_type, SensorType::Flow);
        assert_eq!(data.value, 50);

        token.cancel();
        stream.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_arrive_in_order() {
        let token = CancellationToken::new();
        let mut stream = spawn_sensor(generator("t * 10 + 0.5"), token.clone());

        for expected in 0..5u64 {
            let data = stream.receiver.recv().await.unwrap();
            assert_eq!(data.sequence, expected);
            assert_eq!(data.value, expected as i32);
        }

        token.cancel();
        stream.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ticks_are_skipped() {
        let token = CancellationToken::new();
        // sqrt of a negative number is NaN until t reaches 0.3
        let mut stream = spawn_sensor(generator("sqrt(t - 0.25) + 10"), token.clone());

        let data = stream.receiver.recv().await.unwrap();
        assert_eq!(data.sequence, 3);
        assert_eq!(data.value, 10);

        token.cancel();
        stream.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_blocked_on_full_channel() {
        let token = CancellationToken::new();
        let stream = spawn_sensor(generator("1"), token.clone());

        // Nobody reads, so the task ends up waiting on the full channel
        tokio::time::sleep(Duration::from_secs(2)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), stream.handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_receiver_dropped() {
        let stream = spawn_sensor(generator("1"), CancellationToken::new());
        drop(stream.receiver);
        tokio::time::timeout(Duration::from_secs(1), stream.handle)
            .await
            .unwrap()
            .unwrap();
    }
}
