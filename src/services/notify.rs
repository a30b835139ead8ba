use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};

use crate::entity::{nodes, readings, users};
use crate::error::{AppError, AppResult};
use crate::services::mailer::MailRelayClient;

/// Returns true when enough time has passed since the last alert to mail the
/// user again. An unset timestamp always allows sending.
#[must_use]
pub fn alert_window_elapsed(
    last_sent: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window_hours: i64,
) -> bool {
    match last_sent {
        None => true,
        Some(sent) => now - sent > Duration::hours(window_hours),
    }
}

/// Returns true when a reported value falls outside the configured bounds.
/// Unset bounds never trip, and a reading with no value never trips.
#[must_use]
pub fn out_of_range(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    let Some(value) = value else {
        return false;
    };
    if let Some(min) = min {
        if value < min {
            return true;
        }
    }
    if let Some(max) = max {
        if value > max {
            return true;
        }
    }
    false
}

/// Whether a stored reading should raise a fault alert for its node.
/// A sensor only counts when the node has it enabled and the reported value
/// lies outside that sensor's setpoints.
#[must_use]
pub fn reading_breaches_setpoints(node: &nodes::Model, reading: &readings::Model) -> bool {
    let checks = [
        (
            node.is_temperature,
            reading.temperature,
            node.temperature_min,
            node.temperature_max,
        ),
        (
            node.is_humidity,
            reading.humidity,
            node.humidity_min,
            node.humidity_max,
        ),
        (node.is_co2, reading.co2, node.co2_min, node.co2_max),
    ];

    checks
        .iter()
        .any(|&(enabled, value, min, max)| enabled.unwrap_or(false) && out_of_range(value, min, max))
}

/// Checks a freshly ingested reading against its node's setpoints and mails
/// the owner on a breach. Readings from unregistered devices are ignored.
pub async fn check_reading(
    db: &DatabaseConnection,
    mailer: &MailRelayClient,
    reading: &readings::Model,
    window_hours: i64,
) -> AppResult<()> {
    let Some(node) = nodes::Entity::find()
        .filter(nodes::Column::Uid.eq(&reading.uid))
        .one(db)
        .await?
    else {
        return Ok(());
    };

    if !reading_breaches_setpoints(&node, reading) {
        return Ok(());
    }

    alert_owner(db, mailer, &node, window_hours).await
}

/// Raises a fault alert for the node with the given uid, regardless of its
/// current readings.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the node or its owning user is missing,
/// `AppError::MailRelay` if delivery fails.
pub async fn notify_faulty_node(
    db: &DatabaseConnection,
    mailer: &MailRelayClient,
    uid: &str,
    window_hours: i64,
) -> AppResult<()> {
    let node = nodes::Entity::find()
        .filter(nodes::Column::Uid.eq(uid))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No node with uid {uid}")))?;

    alert_owner(db, mailer, &node, window_hours).await
}

/// Mails the node's owner, subject to the per-user alert window, and stamps
/// the user's `mail_sent` marker on success. The window is per-user: one mail
/// covers every faulty node on that user's dashboard until it reopens.
async fn alert_owner(
    db: &DatabaseConnection,
    mailer: &MailRelayClient,
    node: &nodes::Model,
    window_hours: i64,
) -> AppResult<()> {
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(&node.owner))
        .one(db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No user {} owning node {}", node.owner, node.uid))
        })?;

    let now = Utc::now();
    let last_sent = user.mail_sent.map(|t| t.with_timezone(&Utc));
    if !alert_window_elapsed(last_sent, now, window_hours) {
        tracing::debug!(
            uid = %node.uid,
            username = %user.username,
            "Alert window still open, skipping mail"
        );
        return Ok(());
    }

    let subject = "There are some faulty nodes in your dashboard";
    let body = format!(
        "Dear {}, please check your dashboard: node {} reported readings outside its configured range.",
        user.username, node.uid
    );
    mailer.send(&user.email, subject, &body).await?;

    tracing::info!(uid = %node.uid, username = %user.username, "Sent fault alert");

    let mut active: users::ActiveModel = user.into();
    active.mail_sent = Set(Some(now.into()));
    active.update(db).await?;

    Ok(())
}
