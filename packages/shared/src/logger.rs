//! Logging setup utilities for the keyrace binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Library crates whose spans and events are enabled by the default filter.
const WORKSPACE_CRATES: [&str; 3] = ["keyrace_shared", "keyrace_server", "keyrace_client"];

/// Build the default `EnvFilter` directive string.
///
/// Every workspace library crate and the binary itself are enabled at
/// `default_log_level`; everything else (hyper, tungstenite, ...) stays at
/// the subscriber default.
pub fn default_directives(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    let mut targets: Vec<&str> = WORKSPACE_CRATES.to_vec();
    if !targets.contains(&binary_target.as_str()) {
        targets.push(&binary_target);
    }
    targets
        .iter()
        .map(|target| format!("{}={}", target, default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "keyrace-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use keyrace_shared::logger::setup_logger;
///
/// setup_logger("keyrace-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_do_not_repeat_workspace_binary() {
        // テスト項目: ワークスペースのクレートと同名のバイナリは重複して追加されない
        // given (前提条件):
        let binary = "keyrace-server";

        // when (操作):
        let directives = default_directives(binary, "debug");

        // then (期待する結果):
        assert_eq!(
            directives,
            "keyrace_shared=debug,keyrace_server=debug,keyrace_client=debug"
        );
    }

    #[test]
    fn test_default_directives_append_other_binary() {
        // テスト項目: ワークスペース外の名前のバイナリは末尾に追加される
        // given (前提条件):
        let binary = "race-bench";

        // when (操作):
        let directives = default_directives(binary, "info");

        // then (期待する結果):
        assert_eq!(
            directives,
            "keyrace_shared=info,keyrace_server=info,keyrace_client=info,race_bench=info"
        );
    }
}
