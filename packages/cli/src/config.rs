use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stencil_renderer::{
    DirectEvaluator, Evaluator, PreviewOptions, RenderOptions, SandboxOptions, SandboxedEvaluator,
};

pub const DEFAULT_CONFIG_NAME: &str = "stencil.config.json";

/// Which evaluator implementation renders expressions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    #[default]
    Direct,
    Sandboxed,
}

/// Stencil configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub evaluator: EvaluatorKind,

    /// Per-expression timeout for the sandboxed evaluator
    #[serde(default = "default_evaluator_timeout_ms")]
    pub evaluator_timeout_ms: u64,

    /// Quiet period before a preview re-render
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub pretty: bool,

    #[serde(default)]
    pub full_page: bool,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Undo levels kept while applying edits
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_evaluator_timeout_ms() -> u64 {
    1000
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_history_limit() -> usize {
    100
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn evaluator(&self) -> Arc<dyn Evaluator> {
        match self.evaluator {
            EvaluatorKind::Direct => Arc::new(DirectEvaluator::new()),
            EvaluatorKind::Sandboxed => Arc::new(SandboxedEvaluator::direct(SandboxOptions {
                timeout: Duration::from_millis(self.evaluator_timeout_ms),
                ..SandboxOptions::default()
            })),
        }
    }

    /// Render options with command line flags layered over the config
    pub fn render_options(&self, pretty: bool, full_page: bool) -> RenderOptions {
        RenderOptions {
            pretty: self.pretty || pretty,
            full_page: self.full_page || full_page,
            ..RenderOptions::default()
        }
    }

    pub fn preview_options(&self, pretty: bool, full_page: bool) -> PreviewOptions {
        PreviewOptions {
            debounce: Duration::from_millis(self.debounce_ms),
            render: self.render_options(pretty, full_page),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorKind::default(),
            evaluator_timeout_ms: default_evaluator_timeout_ms(),
            debounce_ms: default_debounce_ms(),
            pretty: false,
            full_page: false,
            log_level: default_log_level(),
            history_limit: default_history_limit(),
        }
    }
}
