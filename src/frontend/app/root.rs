use crate::backend::services::AuthState;
use crate::frontend::app::Route;
use crate::frontend::assets::ResourceLoader;
use crate::frontend::components::toast::{Toaster, Toasts};
use crate::frontend::services::context::{AppServices, AuthContext};

use dioxus::prelude::*;
use dioxus_router::Router;

#[component]
pub fn App() -> Element {
    let services = use_context_provider(AppServices::initialize);
    let state = use_signal(|| {
        services.store.as_ref().map_or_else(
            || AuthState {
                initialized: true,
                ..AuthState::default()
            },
            |store| store.snapshot(),
        )
    });
    use_context_provider(|| AuthContext { state });
    use_context_provider(Toasts::new);

    // Bootstrap the store and mirror every snapshot into the signal
    let store = services.store.clone();
    use_future(move || {
        let store = store.clone();
        let mut state = state;
        async move {
            let Some(store) = store else {
                log::warn!("Backend not configured, auth store not started");
                return;
            };
            let mut updates = store.subscribe();
            let mirror = async move {
                loop {
                    let snapshot = updates.borrow_and_update().clone();
                    state.set(snapshot);
                    if updates.changed().await.is_err() {
                        break;
                    }
                }
            };
            futures_util::future::join(store.start(), mirror).await;
        }
    });

    let store = services.store.clone();
    use_drop(move || {
        if let Some(store) = &store {
            store.shutdown();
        }
    });

    rsx! {
        style { dangerous_inner_html: ResourceLoader::get_app_css() }
        Toaster {}
        Router::<Route> {}
    }
}
