use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

use crate::storage::DbConnection;
use shared::{
    ChangeEvent, Collection, DailyEntry, EntryListResponse, EntryResponse,
    MonthlyAdvancesResponse,
};

use super::access::{ensure_self_or_admin, require_admin};
use super::auth_service::AuthenticatedUser;
use super::change_feed::ChangeFeed;
use super::commands::entries::{ListEntriesQuery, MonthlyAdvancesQuery, UpsertEntryCommand};
use super::errors::{DomainError, DomainResult};

const MAX_NOTES_LEN: usize = 500;

/// Service for recording and reading daily entries
#[derive(Clone)]
pub struct EntryService {
    db: Arc<DbConnection>,
    feed: ChangeFeed,
}

impl EntryService {
    pub fn new(db: Arc<DbConnection>, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    /// Create or update the entry for (target user, date). The write is a
    /// single statement, atomic per entry document; concurrent upserts to
    /// the same entry resolve last-write-wins.
    pub async fn upsert_entry(
        &self,
        caller: &AuthenticatedUser,
        command: UpsertEntryCommand,
    ) -> DomainResult<EntryResponse> {
        validate_date(&command.date)?;
        validate_amount("Cash amount", command.cash_amount)?;
        validate_amount("Network amount", command.network_amount)?;
        validate_amount("Purchases amount", command.purchases_amount)?;
        validate_amount("Advance amount", command.advance_amount)?;
        if command.notes.len() > MAX_NOTES_LEN {
            return Err(DomainError::validation(format!(
                "Notes cannot exceed {} characters",
                MAX_NOTES_LEN
            )));
        }

        let target = command
            .target_user_id
            .as_deref()
            .unwrap_or(&caller.user_id)
            .to_string();
        ensure_self_or_admin(&self.db, caller, &target).await?;

        let now = Utc::now().to_rfc3339();
        let candidate = DailyEntry {
            id: DailyEntry::generate_id(),
            user_id: target,
            date: command.date,
            cash_amount: command.cash_amount,
            network_amount: command.network_amount,
            purchases_amount: command.purchases_amount,
            advance_amount: command.advance_amount,
            notes: command.notes,
            created_at: now.clone(),
            updated_at: now,
        };

        let stored = self.db.upsert_entry(&candidate).await?;
        let created = stored.id == candidate.id;
        info!(
            "{} entry for {} on {}",
            if created { "Created" } else { "Updated" },
            stored.user_id,
            stored.date
        );

        self.feed.publish(ChangeEvent {
            collection: Collection::Entries,
            user_id: Some(stored.user_id.clone()),
            date: Some(stored.date.clone()),
        });

        Ok(EntryResponse {
            entry: stored,
            success_message: if created {
                "Entry created successfully".to_string()
            } else {
                "Entry updated successfully".to_string()
            },
        })
    }

    /// List a user's entries, optionally restricted to one month. Year and
    /// month must be given together.
    pub async fn list_entries(
        &self,
        caller: &AuthenticatedUser,
        query: ListEntriesQuery,
    ) -> DomainResult<EntryListResponse> {
        let month_key = match (query.year, query.month) {
            (Some(year), Some(month)) => Some(format_month_key(year, month)?),
            (None, None) => None,
            _ => {
                return Err(DomainError::validation(
                    "Year and month must be provided together",
                ))
            }
        };

        let target = query
            .target_user_id
            .as_deref()
            .unwrap_or(&caller.user_id)
            .to_string();
        ensure_self_or_admin(&self.db, caller, &target).await?;

        let entries = self.db.list_entries(&target, month_key.as_deref()).await?;
        Ok(EntryListResponse { entries })
    }

    /// Get one entry by (user, date); `None` when nothing is recorded
    pub async fn get_entry(
        &self,
        caller: &AuthenticatedUser,
        target_user_id: Option<&str>,
        date: &str,
    ) -> DomainResult<Option<DailyEntry>> {
        validate_date(date)?;
        let target = target_user_id.unwrap_or(&caller.user_id);
        ensure_self_or_admin(&self.db, caller, target).await?;
        Ok(self.db.get_entry(target, date).await?)
    }

    /// Delete an entry. Admin only: regular users may correct an entry by
    /// upserting it, never remove it.
    pub async fn delete_entry(
        &self,
        caller: &AuthenticatedUser,
        entry_id: &str,
    ) -> DomainResult<()> {
        require_admin(&self.db, caller).await?;

        let entry = self
            .db
            .get_entry_by_id(entry_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Entry not found: {}", entry_id)))?;

        self.db.delete_entry(entry_id).await?;
        info!("Deleted entry {} ({} {})", entry.id, entry.user_id, entry.date);

        self.feed.publish(ChangeEvent {
            collection: Collection::Entries,
            user_id: Some(entry.user_id),
            date: Some(entry.date),
        });

        Ok(())
    }

    /// Sum of advance amounts over one user's entries in one month.
    /// Recomputed per query over at most 31 rows; never cached.
    pub async fn monthly_advances(
        &self,
        caller: &AuthenticatedUser,
        query: MonthlyAdvancesQuery,
    ) -> DomainResult<MonthlyAdvancesResponse> {
        let (year, month) = parse_year_month(&query.year_month)?;
        let month_key = format_month_key(year, month)?;

        let target = query
            .target_user_id
            .as_deref()
            .unwrap_or(&caller.user_id)
            .to_string();
        ensure_self_or_admin(&self.db, caller, &target).await?;

        let entries = self.db.list_entries(&target, Some(&month_key)).await?;
        let advances_total = entries.iter().map(|e| e.advance_amount).sum();

        Ok(MonthlyAdvancesResponse {
            user_id: target,
            year_month: month_key,
            advances_total,
        })
    }
}

/// Validate an ISO calendar date in its canonical zero-padded form.
pub(crate) fn validate_date(date: &str) -> DomainResult<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| DomainError::validation("Date must be a valid YYYY-MM-DD calendar date"))?;

    // Stored keys are canonical: "2024-3-5" must not alias "2024-03-05"
    if parsed.format("%Y-%m-%d").to_string() != date {
        return Err(DomainError::validation(
            "Date must be a valid YYYY-MM-DD calendar date",
        ));
    }

    Ok(parsed)
}

fn validate_amount(label: &str, value: f64) -> DomainResult<()> {
    if !value.is_finite() {
        return Err(DomainError::validation(format!(
            "{} must be a finite number",
            label
        )));
    }
    if value < 0.0 {
        return Err(DomainError::validation(format!(
            "{} cannot be negative",
            label
        )));
    }
    Ok(())
}

/// Parse a "YYYY-MM" month key.
pub(crate) fn parse_year_month(year_month: &str) -> DomainResult<(i32, u32)> {
    let parts: Vec<&str> = year_month.split('-').collect();
    let parsed = if parts.len() == 2 && parts[0].len() == 4 && parts[1].len() == 2 {
        match (parts[0].parse::<i32>(), parts[1].parse::<u32>()) {
            (Ok(year), Ok(month)) => Some((year, month)),
            _ => None,
        }
    } else {
        None
    };

    match parsed {
        Some((year, month)) if (1..=12).contains(&month) => Ok((year, month)),
        _ => Err(DomainError::validation(
            "Month key must be a valid YYYY-MM value",
        )),
    }
}

/// Render a month key, rejecting out-of-range months.
pub(crate) fn format_month_key(year: i32, month: u32) -> DomainResult<String> {
    if !(1..=12).contains(&month) {
        return Err(DomainError::validation("Month must be between 1 and 12"));
    }
    Ok(format!("{:04}-{:02}", year, month))
}
