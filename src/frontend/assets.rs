//! Stylesheet loading and caching.

use std::{collections::HashMap, sync::OnceLock};

static CSS_CACHE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

pub struct ResourceLoader;

impl ResourceLoader {
    fn get_all_styles() -> HashMap<&'static str, &'static str> {
        let mut m = HashMap::new();
        macro_rules! style {
            ($n:expr, $p:expr) => {
                m.insert($n, include_str!(concat!(env!("CARGO_MANIFEST_DIR"), $p)));
            };
        }
        style!("base", "/assets/styles/base.css");
        style!("auth", "/assets/styles/auth.css");
        style!("navigation", "/assets/styles/navigation.css");
        style!("loading", "/assets/styles/loading.css");
        style!("toast", "/assets/styles/toast.css");
        m
    }

    pub fn get_css(name: &str) -> &'static str {
        CSS_CACHE
            .get_or_init(Self::get_all_styles)
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    /// Every stylesheet the shell needs, concatenated in cascade order.
    pub fn get_app_css() -> String {
        ["base", "navigation", "loading", "toast"]
            .iter()
            .map(|name| Self::get_css(name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
