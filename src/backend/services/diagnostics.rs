//! Database check shown on the long-loading panel.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::backend::models::Profile;
use crate::backend::provider::ProfileStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    NoUser,
    ProfilePresent(Profile),
    ProfileAbsent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseReport {
    pub user_id: Option<String>,
    pub outcome: CheckOutcome,
    /// `None` when the count itself failed.
    pub admin_count: Option<usize>,
    pub checked_at: DateTime<Utc>,
}

impl DatabaseReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self.outcome, CheckOutcome::ProfilePresent(_)) && self.admin_count.is_some()
    }

    pub fn summary(&self) -> String {
        let profile = match &self.outcome {
            CheckOutcome::NoUser => "sem usuário autenticado".to_string(),
            CheckOutcome::ProfilePresent(p) => format!("perfil encontrado ({})", p.role.label()),
            CheckOutcome::ProfileAbsent => "perfil ausente".to_string(),
            CheckOutcome::Failed(e) => format!("falha ao consultar perfil: {e}"),
        };
        let admins = self
            .admin_count
            .map_or_else(|| "desconhecido".to_string(), |n| n.to_string());
        format!("{profile}; administradores: {admins}")
    }
}

impl fmt::Display for DatabaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.checked_at.format("%H:%M:%S"),
            self.summary()
        )
    }
}

/// Read-only check of the profiles table. Never writes.
pub async fn check_database(profiles: &dyn ProfileStore, user_id: Option<&str>) -> DatabaseReport {
    let outcome = match user_id {
        None => CheckOutcome::NoUser,
        Some(id) => match profiles.fetch(id).await {
            Ok(Some(profile)) => CheckOutcome::ProfilePresent(profile),
            Ok(None) => CheckOutcome::ProfileAbsent,
            Err(e) => CheckOutcome::Failed(e.to_string()),
        },
    };

    let admin_count = match profiles.count_admins().await {
        Ok(n) => Some(n),
        Err(e) => {
            log::warn!("Admin count failed during database check: {e}");
            None
        }
    };

    let report = DatabaseReport {
        user_id: user_id.map(str::to_string),
        outcome,
        admin_count,
        checked_at: Utc::now(),
    };
    log::info!("Database check: {}", report.summary());
    report
}
