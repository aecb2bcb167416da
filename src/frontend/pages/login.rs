use crate::backend::services::guard::{leaves_login, return_path};
use crate::frontend::components::AuthLayout;
use crate::frontend::components::config_error::ConfigError;
use crate::frontend::components::toast::Toasts;
use crate::frontend::services::{AppServices, AuthContext, use_cooldown};
use crate::utils::error::{AuthError, whole_seconds};
use dioxus::prelude::*;
use dioxus_router::use_navigator;

/// User-facing text for a failed sign-in.
fn describe(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => "E-mail ou senha inválidos.".to_string(),
        AuthError::EmailNotConfirmed => {
            "Confirme seu e-mail antes de entrar. Verifique sua caixa de entrada.".to_string()
        }
        AuthError::RateLimited { cooldown } => format!(
            "Muitas tentativas. Aguarde {} segundos.",
            whole_seconds(cooldown)
        ),
        AuthError::CoolingDown { remaining } => format!(
            "Aguarde {} segundos antes de tentar novamente.",
            whole_seconds(remaining)
        ),
        other => format!("Não foi possível entrar: {other}"),
    }
}

#[component]
pub fn Login(from: String) -> Element {
    let services = use_context::<AppServices>();
    let auth = use_context::<AuthContext>();
    let mut toasts = use_context::<Toasts>();
    let nav = use_navigator();
    let cooldown = use_cooldown();

    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut error = use_signal(String::new);
    let mut submitting = use_signal(|| false);

    let target = return_path(&from);

    // Signed in: the guard at the destination handles profile loading
    use_effect({
        let target = target.clone();
        move || {
            let state = auth.state.read();
            if leaves_login(&state) {
                nav.replace(target.as_str());
            }
        }
    });

    if !services.is_configured() {
        return rsx! { ConfigError {} };
    }

    let mut submit = {
        let store = services.store.clone();
        move || {
            let Some(store) = store.clone() else { return };
            if submitting() {
                return;
            }
            let (email_value, password_value) = (email(), password());
            if email_value.trim().is_empty() || password_value.is_empty() {
                error.set("Informe e-mail e senha.".to_string());
                return;
            }
            error.set(String::new());
            submitting.set(true);
            spawn(async move {
                match store.sign_in(&email_value, &password_value).await {
                    Ok(_) => {
                        password.set(String::new());
                        toasts.success("Login realizado com sucesso");
                    }
                    Err(e) => error.set(describe(&e)),
                }
                submitting.set(false);
            });
        }
    };

    let forgot = {
        let store = services.store.clone();
        move |_| {
            let Some(store) = store.clone() else { return };
            let email_value = email();
            if email_value.trim().is_empty() {
                error.set("Informe seu e-mail para redefinir a senha.".to_string());
                return;
            }
            spawn(async move {
                match store.reset_password(&email_value).await {
                    Ok(()) => toasts.success("Enviamos um link de redefinição para seu e-mail."),
                    Err(e) => toasts.error(describe(&e)),
                }
            });
        }
    };

    let waiting = cooldown().map(|d| whole_seconds(&d));
    let blocked = submitting() || waiting.is_some();

    rsx! {
        AuthLayout {
            form {
                class: "card login",
                onsubmit: move |e| {
                    e.prevent_default();
                    submit();
                },
                h1 { "Entrar" }
                input {
                    r#type: "email",
                    placeholder: "E-mail",
                    value: "{email}",
                    autofocus: true,
                    oninput: move |e| email.set(e.value()),
                }
                input {
                    r#type: "password",
                    placeholder: "Senha",
                    value: "{password}",
                    oninput: move |e| password.set(e.value()),
                }
                if !error().is_empty() {
                    p { class: "error-message", "{error}" }
                }
                button {
                    r#type: "submit",
                    disabled: blocked,
                    {
                        match (submitting(), waiting) {
                            (true, _) => rsx! { "Entrando..." },
                            (false, Some(secs)) => rsx! { "Aguarde {secs}s" },
                            (false, None) => rsx! { "Entrar" },
                        }
                    }
                }
                button { r#type: "button", class: "link", onclick: forgot, "Esqueci minha senha" }
            }
        }
    }
}
