//! Transient notifications.

use std::time::Duration;

use dioxus::prelude::*;

const TOAST_LIFETIME: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    const fn class(self) -> &'static str {
        match self {
            Self::Success => "toast toast-success",
            Self::Error => "toast toast-error",
            Self::Info => "toast toast-info",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Toast {
    id: u64,
    kind: ToastKind,
    message: String,
}

#[derive(Clone, Copy)]
pub struct Toasts {
    items: Signal<Vec<Toast>>,
    next_id: Signal<u64>,
}

impl Toasts {
    pub fn new() -> Self {
        Self {
            items: Signal::new(Vec::new()),
            next_id: Signal::new(0),
        }
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) {
        let id = *self.next_id.peek();
        self.next_id.set(id + 1);
        self.items.write().push(Toast {
            id,
            kind,
            message: message.into(),
        });

        let mut items = self.items;
        spawn(async move {
            tokio::time::sleep(TOAST_LIFETIME).await;
            items.write().retain(|t| t.id != id);
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Error, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Info, message);
    }
}

#[component]
pub fn Toaster() -> Element {
    let toasts = use_context::<Toasts>();
    let items = toasts.items.read().clone();

    rsx! {
        div { class: "toaster",
            for toast in items {
                div { key: "{toast.id}", class: toast.kind.class(), "{toast.message}" }
            }
        }
    }
}
