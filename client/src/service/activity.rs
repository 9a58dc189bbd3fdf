//! Activity service - finds, refreshes and waits on remote activities

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::api::SchematicsApi;
use crate::config::Config;
use crate::domain::activity::{select_latest, Activity};
use crate::domain::status::ActivityKind;
use crate::error::{Error, Result};

/// Shortest delay between two polls of the same activity
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How `wait` polls an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay after the first poll
    pub initial_interval: Duration,
    /// The delay doubles after every poll up to this value
    pub max_interval: Duration,
    /// Overall deadline of one wait, `None` to wait as long as it takes
    pub timeout: Option<Duration>,
}

impl WaitPolicy {
    pub fn from_config(config: &Config) -> Self {
        let initial_interval = Duration::from_millis(config.poll_initial_ms).max(MIN_POLL_INTERVAL);

        Self {
            initial_interval,
            max_interval: Duration::from_millis(config.poll_max_ms).max(initial_interval),
            timeout: config.wait_deadline(),
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Activity service
#[derive(Clone)]
pub struct ActivityService {
    api: SchematicsApi,
    policy: WaitPolicy,
}

impl ActivityService {
    /// Create a new activity service
    pub fn new(api: SchematicsApi, policy: WaitPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Every activity of a workspace, in service order. Records without an
    /// action ID are skipped.
    pub async fn list(&self, workspace_id: &str) -> Result<Vec<Activity>> {
        let response = self.api.list_activities(workspace_id).await?;

        Ok(response
            .actions
            .unwrap_or_default()
            .iter()
            .filter_map(|record| Activity::from_wire(workspace_id, record))
            .collect())
    }

    /// Fetch one activity by ID
    pub async fn get(&self, workspace_id: &str, activity_id: &str) -> Result<Activity> {
        let mut record = self.api.get_activity(workspace_id, activity_id).await?;
        if record.action_id.as_deref().map_or(true, str::is_empty) {
            record.action_id = Some(activity_id.to_string());
        }

        Activity::from_wire(workspace_id, &record).ok_or_else(|| {
            Error::Internal(format!("Activity {} has no usable ID", activity_id))
        })
    }

    /// Re-read the activity from the service
    pub async fn refresh(&self, activity: &mut Activity) -> Result<()> {
        let record = self
            .api
            .get_activity(&activity.workspace_id, &activity.id)
            .await?;
        activity.update(&record);
        Ok(())
    }

    /// The most recent `kind` activity performed by `performed_by` on the
    /// workspace, or `None` when there is none yet
    pub async fn last_activity(
        &self,
        workspace_id: &str,
        performed_by: &str,
        kind: &ActivityKind,
    ) -> Result<Option<Activity>> {
        let activities = self.list(workspace_id).await?;
        let selected = select_latest(&activities, kind, performed_by).cloned();

        match &selected {
            Some(activity) => debug!(
                "Resolved {} activity {} of workspace {}",
                kind, activity.id, workspace_id
            ),
            None => debug!(
                "No {} activity by {:?} on workspace {} ({} activities)",
                kind,
                performed_by,
                workspace_id,
                activities.len()
            ),
        }

        Ok(selected)
    }

    /// Poll the activity until it finishes.
    ///
    /// Returns `Ok` once the status is `DONE`, [`Error::ActivityFailed`] for
    /// any other final status and [`Error::WaitTimeout`] when the policy
    /// deadline passes first. An absent activity is already finished.
    pub async fn wait(&self, activity: Option<&mut Activity>) -> Result<()> {
        let Some(activity) = activity else {
            debug!("No activity to wait for");
            return Ok(());
        };

        let Some(limit) = self.policy.timeout else {
            return self.poll_until_finished(activity).await;
        };

        let outcome = timeout(limit, self.poll_until_finished(&mut *activity)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Gave up waiting for activity {} after {:?}",
                    activity.id, limit
                );
                Err(Error::WaitTimeout {
                    id: activity.id.clone(),
                    workspace_id: activity.workspace_id.clone(),
                    status: activity.status.to_string(),
                    timeout_secs: limit.as_secs(),
                })
            }
        }
    }

    async fn poll_until_finished(&self, activity: &mut Activity) -> Result<()> {
        let mut delay = self.policy.initial_interval.max(MIN_POLL_INTERVAL);

        loop {
            self.refresh(activity).await?;
            debug!(
                "Activity {} ({}) on workspace {} is {}",
                activity.id, activity.name, activity.workspace_id, activity.status
            );

            if activity.status.is_success() {
                info!("Activity {} ({}) is done", activity.id, activity.name);
                return Ok(());
            }
            if activity.is_finished() {
                warn!(
                    "Activity {} ({}) finished with status {}",
                    activity.id, activity.name, activity.status
                );
                return Err(Error::ActivityFailed {
                    id: activity.id.clone(),
                    name: activity.name.to_string(),
                    workspace_id: activity.workspace_id.clone(),
                    status: activity.status.to_string(),
                    message: activity.message.clone(),
                });
            }

            sleep(delay).await;
            delay = (delay * 2)
                .min(self.policy.max_interval)
                .max(MIN_POLL_INTERVAL);
        }
    }
}
