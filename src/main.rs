mod backend;
mod frontend;
mod utils;

use crate::frontend::app::App;
use dioxus::LaunchBuilder;
use dioxus_desktop::{Config, LogicalSize, WindowBuilder};
use std::sync::OnceLock;
use tokio::runtime::Runtime;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn main() {
    // Logging setup
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Auth store tasks are spawned on this runtime
    let runtime = RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to create runtime")
    });
    let _entered = runtime.enter();

    let size = LogicalSize::new(1180.0, 780.0);
    let config = Config::default()
        .with_window(
            WindowBuilder::new()
                .with_title("Academia - Back-office")
                .with_inner_size(size)
                .with_min_inner_size(LogicalSize::new(900.0, 620.0)),
        )
        .with_menu(None);

    LaunchBuilder::new().with_cfg(config).launch(App);
}
