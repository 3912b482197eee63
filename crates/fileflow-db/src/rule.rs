//! Rule repository.
//!
//! Rules are ordered by ascending priority with creation time and id as
//! stable tie-breakers, so selection order is deterministic even when
//! priorities collide.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use fileflow_core::models::{CreateRule, Rule, UpdateRule};

use crate::traits::RuleStore;

#[derive(Clone)]
pub struct RuleRepository {
    pool: PgPool,
}

const RULE_COLUMNS: &str =
    "id, name, description, priority, enabled, conditions, actions, created_at, updated_at";

const RULE_ORDER: &str = "priority ASC, created_at ASC, id ASC";

fn rule_from_row(row: &PgRow) -> Result<Rule> {
    let conditions: serde_json::Value = row.try_get("conditions")?;
    let actions: serde_json::Value = row.try_get("actions")?;

    Ok(Rule {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        priority: row.try_get("priority")?,
        enabled: row.try_get("enabled")?,
        conditions: serde_json::from_value(conditions)
            .context("Malformed conditions on rule row")?,
        actions: serde_json::from_value(actions).context("Malformed actions on rule row")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl RuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Rule>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM rules ORDER BY {}",
            RULE_COLUMNS, RULE_ORDER
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list rules")?;

        rows.iter().map(rule_from_row).collect()
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Rule>> {
        let row = sqlx::query(&format!("SELECT {} FROM rules WHERE id = $1", RULE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch rule")?;

        row.as_ref().map(rule_from_row).transpose()
    }

    #[tracing::instrument(skip(self, rule), fields(name = %rule.name))]
    pub async fn create(&self, rule: CreateRule) -> Result<Rule> {
        let conditions =
            serde_json::to_value(&rule.conditions).context("Failed to serialize conditions")?;
        let actions = serde_json::to_value(&rule.actions).context("Failed to serialize actions")?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO rules (id, name, description, priority, enabled, conditions, actions,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.priority)
        .bind(rule.enabled)
        .bind(conditions)
        .bind(actions)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create rule")?;

        rule_from_row(&row)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update(&self, id: Uuid, update: UpdateRule) -> Result<Option<Rule>> {
        let conditions = update
            .conditions
            .map(|c| serde_json::to_value(&c))
            .transpose()
            .context("Failed to serialize conditions")?;
        let actions = update
            .actions
            .map(|a| serde_json::to_value(&a))
            .transpose()
            .context("Failed to serialize actions")?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE rules SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                enabled = COALESCE($5, enabled),
                conditions = COALESCE($6, conditions),
                actions = COALESCE($7, actions),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.priority)
        .bind(update.enabled)
        .bind(conditions)
        .bind(actions)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update rule")?;

        row.as_ref().map(rule_from_row).transpose()
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete rule")?;

        Ok(result.rows_affected() > 0)
    }

    /// Rewrites priorities to match the given id order. Ids not present in
    /// the list keep their existing priority.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn reorder(&self, ids: &[Uuid]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin reorder transaction")?;

        for (position, id) in ids.iter().enumerate() {
            sqlx::query("UPDATE rules SET priority = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(position as i32)
                .execute(&mut *tx)
                .await
                .context("Failed to reorder rule")?;
        }

        tx.commit()
            .await
            .context("Failed to commit reorder transaction")?;
        Ok(())
    }
}

#[async_trait]
impl RuleStore for RuleRepository {
    #[tracing::instrument(skip(self))]
    async fn list_enabled(&self) -> Result<Vec<Rule>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM rules WHERE enabled ORDER BY {}",
            RULE_COLUMNS, RULE_ORDER
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list enabled rules")?;

        rows.iter().map(rule_from_row).collect()
    }
}
