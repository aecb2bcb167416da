use dioxus::prelude::*;

use crate::backend::services::{DatabaseReport, check_database};
use crate::frontend::services::AppServices;

/// Handle for running the database check from a button.
#[derive(Clone)]
pub struct DatabaseCheck {
    services: AppServices,
    pub report: Signal<Option<DatabaseReport>>,
    pub running: Signal<bool>,
}

impl DatabaseCheck {
    pub fn run(&self, user_id: Option<String>) {
        let Some(store) = self.services.store.clone() else {
            return;
        };
        let mut report = self.report;
        let mut running = self.running;
        if *running.peek() {
            return;
        }
        running.set(true);
        spawn(async move {
            let profiles = store.profiles();
            let result = check_database(profiles.as_ref(), user_id.as_deref()).await;
            report.set(Some(result));
            running.set(false);
        });
    }
}

pub fn use_database_check() -> DatabaseCheck {
    DatabaseCheck {
        services: use_context::<AppServices>(),
        report: use_signal(|| None),
        running: use_signal(|| false),
    }
}
