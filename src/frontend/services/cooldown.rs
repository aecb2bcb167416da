use std::time::Duration;

use dioxus::prelude::*;

use crate::frontend::services::AppServices;

/// Remaining sign-in cooldown, refreshed four times a second.
pub fn use_cooldown() -> Signal<Option<Duration>> {
    let services = use_context::<AppServices>();
    let mut remaining = use_signal(|| None::<Duration>);

    use_future(move || {
        let store = services.store.clone();
        async move {
            let Some(store) = store else { return };
            loop {
                let now = store.cooldown_remaining();
                if *remaining.peek() != now {
                    remaining.set(now);
                }
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
    });

    remaining
}
