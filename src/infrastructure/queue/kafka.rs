//! Kafka-backed event queue.

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::Offset;
use rdkafka::TopicPartitionList;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::entities::Event;
use crate::domain::queue::{
    EventQueue, PartitionReader, PublishReceipt, QueueError, QueueMessage, QueueSubscription,
};

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings shared by the producer and the subscription.
#[derive(Debug, Clone)]
pub struct KafkaSettings {
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    pub publish_timeout: Duration,
}

/// Producer publishing events as JSON keyed by `user_id`.
#[derive(Clone)]
pub struct KafkaEventQueue {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaEventQueue {
    /// Creates the producer. No broker round trip happens here.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Publish`] on invalid client configuration.
    pub fn new(settings: &KafkaSettings) -> Result<Self, QueueError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("message.timeout.ms", settings.publish_timeout.as_millis().to_string())
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .create()
            .map_err(|e| QueueError::Publish(format!("Failed to create Kafka producer: {}", e)))?;

        info!(topic = %settings.topic, "Kafka producer created");

        Ok(Self {
            producer,
            topic: settings.topic.clone(),
            timeout: settings.publish_timeout,
        })
    }
}

#[async_trait]
impl EventQueue for KafkaEventQueue {
    async fn publish(&self, event: &Event) -> Result<PublishReceipt, QueueError> {
        let payload = serde_json::to_vec(event)
            .map_err(|e| QueueError::Publish(format!("Failed to encode event: {}", e)))?;

        let record = FutureRecord::to(&self.topic)
            .key(event.user_id.as_str())
            .payload(&payload);

        match self.producer.send(record, self.timeout).await {
            Ok((partition, offset)) => {
                debug!(
                    partition,
                    offset,
                    user_id = %event.user_id,
                    "Event published"
                );
                Ok(PublishReceipt { partition, offset })
            }
            Err((e, _)) => Err(QueueError::Publish(e.to_string())),
        }
    }

    async fn flush(&self, timeout: Duration) -> Result<(), QueueError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| QueueError::Publish(format!("Flush task failed: {}", e)))?
            .map_err(|e| QueueError::Publish(format!("Flush failed: {}", e)))
    }
}

/// Per-partition consumers over one topic.
///
/// Each partition gets its own consumer with a manual assignment, so every
/// reader sees its partition strictly in offset order. Offsets are committed
/// automatically under `group_id`; a fresh group starts at the latest offset.
pub struct KafkaSubscription {
    settings: KafkaSettings,
}

impl KafkaSubscription {
    pub fn new(settings: KafkaSettings) -> Self {
        Self { settings }
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.settings.brokers)
            .set("group.id", &self.settings.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("auto.offset.reset", "latest")
            .set("enable.partition.eof", "false");
        config
    }
}

#[async_trait]
impl QueueSubscription for KafkaSubscription {
    async fn partitions(&self) -> Result<Vec<i32>, QueueError> {
        let config = self.client_config();
        let topic = self.settings.topic.clone();

        tokio::task::spawn_blocking(move || {
            let consumer: BaseConsumer = config
                .create()
                .map_err(|e| QueueError::Consume(format!("Failed to create Kafka consumer: {}", e)))?;

            let metadata = consumer
                .fetch_metadata(Some(&topic), METADATA_TIMEOUT)
                .map_err(|e| QueueError::Consume(format!("Failed to fetch Kafka metadata: {}", e)))?;

            let partitions: Vec<i32> = metadata
                .topics()
                .iter()
                .filter(|t| t.name() == topic)
                .flat_map(|t| t.partitions().iter().map(|p| p.id()))
                .collect();

            if partitions.is_empty() {
                return Err(QueueError::Consume(format!(
                    "Topic {} has no partitions",
                    topic
                )));
            }
            Ok(partitions)
        })
        .await
        .map_err(|e| QueueError::Consume(format!("Metadata task failed: {}", e)))?
    }

    async fn open(&self, partition: i32) -> Result<Box<dyn PartitionReader>, QueueError> {
        let fatal = |reason: String| QueueError::Fatal { partition, reason };

        let consumer: StreamConsumer = self
            .client_config()
            .create()
            .map_err(|e| fatal(format!("Failed to create Kafka consumer: {}", e)))?;

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&self.settings.topic, partition, Offset::Stored)
            .map_err(|e| fatal(e.to_string()))?;
        consumer
            .assign(&tpl)
            .map_err(|e| fatal(format!("Failed to assign partition: {}", e)))?;

        info!(topic = %self.settings.topic, partition, "Partition consumer assigned");

        Ok(Box::new(KafkaPartitionReader {
            consumer,
            partition,
        }))
    }
}

struct KafkaPartitionReader {
    consumer: StreamConsumer,
    partition: i32,
}

fn classify(partition: i32, e: KafkaError) -> QueueError {
    match e {
        KafkaError::MessageConsumptionFatal(code)
        | KafkaError::MessageConsumption(code @ RDKafkaErrorCode::UnknownTopicOrPartition) => {
            QueueError::Fatal {
                partition,
                reason: code.to_string(),
            }
        }
        other => QueueError::Consume(other.to_string()),
    }
}

#[async_trait]
impl PartitionReader for KafkaPartitionReader {
    async fn next(&mut self) -> Option<Result<QueueMessage, QueueError>> {
        let result = match self.consumer.recv().await {
            Ok(msg) => Ok(QueueMessage {
                partition: msg.partition(),
                offset: msg.offset(),
                payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            }),
            Err(e) => {
                let err = classify(self.partition, e);
                if !matches!(err, QueueError::Fatal { .. }) {
                    warn!(partition = self.partition, "Kafka consume error: {}", err);
                }
                Err(err)
            }
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_consume_errors_stop_the_partition() {
        let err = classify(
            4,
            KafkaError::MessageConsumption(RDKafkaErrorCode::UnknownTopicOrPartition),
        );
        assert!(matches!(err, QueueError::Fatal { partition: 4, .. }));

        let err = classify(4, KafkaError::MessageConsumptionFatal(RDKafkaErrorCode::Fatal));
        assert!(matches!(err, QueueError::Fatal { .. }));
    }

    #[test]
    fn test_transient_consume_errors_are_not_fatal() {
        let err = classify(
            1,
            KafkaError::MessageConsumption(RDKafkaErrorCode::BrokerTransportFailure),
        );
        assert!(matches!(err, QueueError::Consume(_)));
    }
}
