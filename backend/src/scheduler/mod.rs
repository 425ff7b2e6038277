//! Recurring LST auto-repayment schedules.

mod driver;

pub use driver::ScheduleDriver;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::ids::{IdError, IdGenerator};
use crate::interest::{DEMO_ADDRESS, DEMO_LOAN_IDS};
use crate::lst;
use crate::validation::address_key;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid frequency. Must be daily, weekly, or monthly")]
    InvalidFrequency,

    #[error("Invalid status. Must be active, paused, or cancelled")]
    InvalidStatus,

    #[error("Unsupported LST token: {0}")]
    UnsupportedToken(String),

    #[error("Schedule not found: {0}")]
    NotFound(String),

    #[error("Schedule is not active")]
    NotActive,

    #[error(transparent)]
    Id(#[from] IdError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn period(self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::days(7),
            Self::Monthly => Duration::days(30),
        }
    }
}

impl FromStr for Frequency {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(ScheduleError::InvalidFrequency),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Active,
    Paused,
    Cancelled,
}

impl FromStr for ScheduleStatus {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ScheduleError::InvalidStatus),
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentSchedule {
    pub schedule_id: String,
    pub loan_id: String,
    pub lst_token: String,
    pub frequency: Frequency,
    pub next_execution: DateTime<Utc>,
    pub last_execution: Option<DateTime<Utc>>,
    pub status: ScheduleStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSchedules {
    pub address: String,
    pub auto_repay_enabled: bool,
    pub schedules: Vec<RepaymentSchedule>,
    pub total_schedules: usize,
    pub active_schedules: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub schedule_id: String,
    pub user_address: String,
    pub loan_id: String,
    pub lst_token: String,
    pub executed_at: DateTime<Utc>,
    pub next_execution: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Owner {
    auto_repay_enabled: bool,
    schedules: Vec<RepaymentSchedule>,
}

pub struct ScheduleBook {
    ids: IdGenerator,
    owners: RwLock<HashMap<String, Owner>>,
}

impl ScheduleBook {
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            ids,
            owners: RwLock::new(HashMap::new()),
        }
    }

    pub async fn setup(
        &self,
        address: &str,
        loan_id: &str,
        lst_token: &str,
        frequency: Frequency,
        now: DateTime<Utc>,
    ) -> Result<RepaymentSchedule, ScheduleError> {
        if !lst::is_lst(lst_token) {
            return Err(ScheduleError::UnsupportedToken(lst_token.to_string()));
        }
        let schedule = RepaymentSchedule {
            schedule_id: self.ids.hex_id()?,
            loan_id: loan_id.to_string(),
            lst_token: lst_token.trim().to_string(),
            frequency,
            next_execution: now + frequency.period(),
            last_execution: None,
            status: ScheduleStatus::Active,
        };

        let key = address_key(address);
        let mut owners = self.owners.write().await;
        let owner = owners.entry(key.clone()).or_default();
        owner.auto_repay_enabled = true;
        owner.schedules.push(schedule.clone());

        tracing::info!(
            address = %key,
            schedule_id = %schedule.schedule_id,
            frequency = ?frequency,
            "repayment schedule created"
        );
        Ok(schedule)
    }

    pub async fn user_schedules(&self, address: &str) -> UserSchedules {
        let owners = self.owners.read().await;
        let (enabled, schedules) = owners
            .get(&address_key(address))
            .map(|owner| (owner.auto_repay_enabled, owner.schedules.clone()))
            .unwrap_or_default();
        let active_schedules = schedules
            .iter()
            .filter(|schedule| schedule.status == ScheduleStatus::Active)
            .count();

        UserSchedules {
            address: address.to_string(),
            auto_repay_enabled: enabled,
            total_schedules: schedules.len(),
            active_schedules,
            schedules,
        }
    }

    pub async fn update(
        &self,
        schedule_id: &str,
        frequency: Option<Frequency>,
        status: Option<ScheduleStatus>,
    ) -> Result<RepaymentSchedule, ScheduleError> {
        let mut owners = self.owners.write().await;
        let schedule = owners
            .values_mut()
            .flat_map(|owner| owner.schedules.iter_mut())
            .find(|schedule| schedule.schedule_id == schedule_id)
            .ok_or_else(|| ScheduleError::NotFound(schedule_id.to_string()))?;

        if let Some(frequency) = frequency {
            schedule.frequency = frequency;
        }
        if let Some(status) = status {
            schedule.status = status;
        }
        tracing::info!(%schedule_id, status = %schedule.status, "repayment schedule updated");
        Ok(schedule.clone())
    }

    pub async fn delete(&self, schedule_id: &str) -> Result<RepaymentSchedule, ScheduleError> {
        let mut owners = self.owners.write().await;
        for owner in owners.values_mut() {
            if let Some(index) = owner
                .schedules
                .iter()
                .position(|schedule| schedule.schedule_id == schedule_id)
            {
                tracing::info!(%schedule_id, "repayment schedule deleted");
                return Ok(owner.schedules.remove(index));
            }
        }
        Err(ScheduleError::NotFound(schedule_id.to_string()))
    }

    /// Runs an active schedule now and moves `next_execution` one period on.
    pub async fn execute(
        &self,
        schedule_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Execution, ScheduleError> {
        let mut owners = self.owners.write().await;
        let (address, schedule) = owners
            .iter_mut()
            .find_map(|(address, owner)| {
                owner
                    .schedules
                    .iter_mut()
                    .find(|schedule| schedule.schedule_id == schedule_id)
                    .map(|schedule| (address.clone(), schedule))
            })
            .ok_or_else(|| ScheduleError::NotFound(schedule_id.to_string()))?;

        if schedule.status != ScheduleStatus::Active {
            return Err(ScheduleError::NotActive);
        }
        Ok(stamp(&address, schedule, now))
    }

    /// Executes every active schedule whose `next_execution` has passed.
    pub async fn execute_due(&self, now: DateTime<Utc>) -> Vec<Execution> {
        let mut owners = self.owners.write().await;
        owners
            .iter_mut()
            .flat_map(|(address, owner)| {
                owner
                    .schedules
                    .iter_mut()
                    .filter(move |schedule| {
                        schedule.status == ScheduleStatus::Active && schedule.next_execution <= now
                    })
                    .map(move |schedule| stamp(address, schedule, now))
            })
            .collect()
    }

    pub async fn seed_demo(&self, now: DateTime<Utc>) {
        let schedules = vec![
            RepaymentSchedule {
                schedule_id: DEMO_LOAN_IDS[0].to_string(),
                loan_id: DEMO_LOAN_IDS[0].to_string(),
                lst_token: "stETH".to_string(),
                frequency: Frequency::Daily,
                next_execution: now + Duration::days(1),
                last_execution: Some(now - Duration::days(1)),
                status: ScheduleStatus::Active,
            },
            RepaymentSchedule {
                schedule_id: DEMO_LOAN_IDS[1].to_string(),
                loan_id: DEMO_LOAN_IDS[1].to_string(),
                lst_token: "rETH".to_string(),
                frequency: Frequency::Weekly,
                next_execution: now + Duration::days(7),
                last_execution: Some(now - Duration::days(7)),
                status: ScheduleStatus::Active,
            },
        ];
        self.owners.write().await.insert(
            address_key(DEMO_ADDRESS),
            Owner {
                auto_repay_enabled: true,
                schedules,
            },
        );
    }
}

fn stamp(address: &str, schedule: &mut RepaymentSchedule, now: DateTime<Utc>) -> Execution {
    schedule.last_execution = Some(now);
    schedule.next_execution = now + schedule.frequency.period();
    tracing::info!(
        address,
        schedule_id = %schedule.schedule_id,
        next_execution = %schedule.next_execution,
        "repayment schedule executed"
    );

    Execution {
        schedule_id: schedule.schedule_id.clone(),
        user_address: address.to_string(),
        loan_id: schedule.loan_id.clone(),
        lst_token: schedule.lst_token.clone(),
        executed_at: now,
        next_execution: schedule.next_execution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "0x1234567890123456789012345678901234567890";

    fn book() -> ScheduleBook {
        ScheduleBook::new(IdGenerator::new())
    }

    #[test]
    fn parses_frequencies_and_statuses() {
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert!(matches!(
            "hourly".parse::<Frequency>(),
            Err(ScheduleError::InvalidFrequency)
        ));
        assert_eq!("paused".parse::<ScheduleStatus>().unwrap(), ScheduleStatus::Paused);
        assert!("done".parse::<ScheduleStatus>().is_err());
    }

    #[tokio::test]
    async fn setup_schedules_first_run_one_period_out() {
        let book = book();
        let now = Utc::now();
        let schedule = book
            .setup(USER, "0xloan", "stETH", Frequency::Weekly, now)
            .await
            .unwrap();

        assert_eq!(schedule.next_execution, now + Duration::days(7));
        assert_eq!(schedule.schedule_id.len(), 66);
        let user = book.user_schedules(USER).await;
        assert!(user.auto_repay_enabled);
        assert_eq!((user.total_schedules, user.active_schedules), (1, 1));
    }

    #[tokio::test]
    async fn setup_rejects_non_lst_tokens() {
        assert!(matches!(
            book().setup(USER, "0xloan", "USDC", Frequency::Daily, Utc::now()).await,
            Err(ScheduleError::UnsupportedToken(_))
        ));
    }

    #[tokio::test]
    async fn execution_advances_by_the_frequency_period() {
        let book = book();
        let now = Utc::now();
        let schedule = book
            .setup(USER, "0xloan", "rETH", Frequency::Monthly, now)
            .await
            .unwrap();

        let later = now + Duration::hours(3);
        let execution = book.execute(&schedule.schedule_id, later).await.unwrap();
        assert_eq!(execution.executed_at, later);
        assert_eq!(execution.next_execution, later + Duration::days(30));
        assert_eq!(execution.user_address, USER);
    }

    #[tokio::test]
    async fn paused_schedules_do_not_execute() {
        let book = book();
        let schedule = book
            .setup(USER, "0xloan", "stETH", Frequency::Daily, Utc::now())
            .await
            .unwrap();
        book.update(&schedule.schedule_id, None, Some(ScheduleStatus::Paused))
            .await
            .unwrap();

        assert!(matches!(
            book.execute(&schedule.schedule_id, Utc::now()).await,
            Err(ScheduleError::NotActive)
        ));
        assert_eq!(book.user_schedules(USER).await.active_schedules, 0);
    }

    #[tokio::test]
    async fn execute_due_only_touches_due_active_schedules() {
        let book = book();
        let now = Utc::now();
        let daily = book
            .setup(USER, "0xa", "stETH", Frequency::Daily, now)
            .await
            .unwrap();
        book.setup(USER, "0xb", "stETH", Frequency::Weekly, now)
            .await
            .unwrap();

        let tick = now + Duration::days(2);
        let executed = book.execute_due(tick).await;
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].schedule_id, daily.schedule_id);
        assert!(book.execute_due(tick).await.is_empty());
    }

    #[tokio::test]
    async fn delete_and_update_report_unknown_ids() {
        let book = book();
        assert!(matches!(
            book.delete("0xnope").await,
            Err(ScheduleError::NotFound(_))
        ));
        assert!(matches!(
            book.update("0xnope", Some(Frequency::Daily), None).await,
            Err(ScheduleError::NotFound(_))
        ));
    }
}
