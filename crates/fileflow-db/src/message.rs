//! Postgres-backed message queue for pipeline stage delivery.
//!
//! Delivery is at-least-once: a message claimed by a crashed worker stays
//! IN_FLIGHT until the reaper returns it to PENDING, and a retried message
//! may run again on a worker that already partially processed it. Stage
//! handlers are written to tolerate redelivery.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Channel used to wake workers when a message is enqueued.
pub const MESSAGE_NOTIFY_CHANNEL: &str = "fileflow_new_message";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub max_attempts: i32,
}

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a message and notify listening workers.
    #[tracing::instrument(skip(self, payload))]
    pub async fn enqueue(
        &self,
        topic: &str,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Result<Uuid> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for enqueue")?;

        let id: Uuid = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO messages (id, topic, payload, status, attempts, max_attempts, available_at)
            VALUES ($1, $2, $3, 'PENDING', 0, $4, NOW())
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(topic)
        .bind(payload)
        .bind(max_attempts)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert message")?;

        // Wake workers immediately instead of waiting for the poll interval.
        // Non-fatal: workers discover messages via polling if NOTIFY fails.
        if let Err(e) = sqlx::query(&format!("SELECT pg_notify('{}', '')", MESSAGE_NOTIFY_CHANNEL))
            .execute(&mut *tx)
            .await
        {
            tracing::warn!(
                error = %e,
                message_id = %id,
                "Failed to send pg_notify for new message, workers will poll"
            );
        }

        tx.commit()
            .await
            .context("Failed to commit enqueue transaction")?;

        tracing::debug!(message_id = %id, topic, "Message enqueued");
        Ok(id)
    }

    /// Atomically claim the next available message, incrementing its attempt
    /// count. Uses FOR UPDATE SKIP LOCKED so concurrent workers never claim
    /// the same message.
    #[tracing::instrument(skip(self))]
    pub async fn claim_next(&self) -> Result<Option<QueuedMessage>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let claimed: Option<QueuedMessage> = sqlx::query_as::<Postgres, QueuedMessage>(
            r#"
            SELECT id, topic, payload, attempts, max_attempts
            FROM messages
            WHERE status = 'PENDING'
                AND available_at <= NOW()
            ORDER BY available_at ASC, created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch next message")?;

        match claimed {
            Some(mut message) => {
                sqlx::query(
                    r#"
                    UPDATE messages
                    SET status = 'IN_FLIGHT',
                        attempts = attempts + 1,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(message.id)
                .execute(&mut *tx)
                .await
                .context("Failed to mark message in flight")?;

                tx.commit().await.context("Failed to commit claim")?;

                message.attempts += 1;
                tracing::debug!(
                    message_id = %message.id,
                    topic = %message.topic,
                    attempts = message.attempts,
                    "Message claimed"
                );
                Ok(Some(message))
            }
            None => {
                tx.rollback().await.ok();
                Ok(None)
            }
        }
    }

    /// Delete a successfully processed message.
    #[tracing::instrument(skip(self))]
    pub async fn mark_done(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete processed message")?;

        tracing::debug!(message_id = %id, "Message done");
        Ok(())
    }

    /// Acknowledge and discard a message that can never succeed, such as a
    /// malformed payload. Equivalent to mark_done but logged distinctly.
    #[tracing::instrument(skip(self))]
    pub async fn mark_dropped(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to drop message")?;

        tracing::warn!(message_id = %id, "Message permanently dropped");
        Ok(())
    }

    /// Return a message to the queue after a transient failure, delaying the
    /// next attempt by `delay_seconds`.
    #[tracing::instrument(skip(self))]
    pub async fn retry_later(&self, id: Uuid, delay_seconds: u64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE messages
            SET status = 'PENDING',
                available_at = NOW() + ($2 * interval '1 second'),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(delay_seconds as i64)
        .execute(&self.pool)
        .await
        .context("Failed to schedule message retry")?;

        tracing::info!(message_id = %id, delay_seconds, "Message retry scheduled");
        Ok(())
    }

    /// Return IN_FLIGHT messages whose claim is older than `grace_seconds`
    /// to PENDING. A claim that old means the worker crashed or was killed
    /// mid-dispatch; the attempt counter was already incremented at claim
    /// time, so redelivery still converges on mark_dead.
    #[tracing::instrument(skip(self))]
    pub async fn reap_stale_in_flight(&self, grace_seconds: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = 'PENDING',
                available_at = NOW(),
                updated_at = NOW()
            WHERE status = 'IN_FLIGHT'
                AND updated_at < NOW() - ($1 * interval '1 second')
            "#,
        )
        .bind(grace_seconds)
        .execute(&self.pool)
        .await
        .context("Failed to reap stale in-flight messages")?;

        let reaped = result.rows_affected();
        if reaped > 0 {
            tracing::warn!(reaped, "Requeued stale in-flight messages");
        }
        Ok(reaped)
    }

    /// Park a message whose attempts are exhausted.
    #[tracing::instrument(skip(self))]
    pub async fn mark_dead(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE messages
            SET status = 'DEAD',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to mark message dead")?;

        tracing::error!(message_id = %id, "Message moved to dead state");
        Ok(())
    }
}
