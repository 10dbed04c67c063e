/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Engine-wide constants: fatal-error messages (states that should never
//! happen and leave the engine in an unknown state), normal/user-facing
//! error messages, settings, and the UCI option table.

/// Messages for conditions that should never happen; if one fires the
/// engine is in an unknown state and panics rather than limping on.
pub struct ErrFatal;
impl ErrFatal {
    pub const LOCK: &'static str = "Lock failed.";
    pub const THREAD: &'static str = "Thread has failed.";
    pub const CHANNEL: &'static str = "Broken channel.";
    pub const INIT: &'static str = "Engine initialization failed.";
}

/// User-visible error messages for recoverable conditions.
pub struct ErrNormal;
impl ErrNormal {
    pub const NOT_LEGAL: &'static str = "This is not a legal move in this position.";
    pub const NOT_INT: &'static str = "The value given was not an integer.";
    pub const FEN_FAILED: &'static str = "Setting up FEN failed. Position not changed.";
    pub const UNKNOWN_OPTION: &'static str = "Unknown option name.";
}

/// Runtime-configurable engine settings, changed via UCI `setoption`.
pub struct Settings {
    pub threads: usize,
    pub hash_mb: usize,
    pub multi_pv: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threads: EngineOptionDefaults::THREADS_DEFAULT,
            hash_mb: EngineOptionDefaults::HASH_DEFAULT,
            multi_pv: EngineOptionDefaults::MULTI_PV_DEFAULT,
        }
    }
}

pub enum UiElement {
    Spin,
    Button,
}

pub struct EngineOption {
    pub name: &'static str,
    pub ui_element: UiElement,
    pub default: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
}

impl EngineOption {
    pub fn new(name: &'static str, ui_element: UiElement, default: Option<String>, min: Option<String>, max: Option<String>) -> Self {
        Self { name, ui_element, default, min, max }
    }
}

#[derive(PartialEq, Clone, Debug)]
pub enum EngineOptionName {
    Hash(String),
    ClearHash,
    Threads(String),
    MultiPv(String),
    Nothing,
}

impl EngineOptionName {
    pub const HASH: &'static str = "Hash";
    pub const CLEAR_HASH: &'static str = "Clear Hash";
    pub const THREADS: &'static str = "Threads";
    pub const MULTI_PV: &'static str = "MultiPV";
}

pub struct EngineOptionDefaults;
impl EngineOptionDefaults {
    pub const HASH_DEFAULT: usize = 32;
    pub const HASH_MIN: usize = 1;
    pub const HASH_MAX: usize = 16384;
    pub const THREADS_DEFAULT: usize = 1;
    pub const THREADS_MIN: usize = 1;
    pub const THREADS_MAX: usize = 32;
    pub const MULTI_PV_DEFAULT: usize = 1;
    pub const MULTI_PV_MIN: usize = 1;
    pub const MULTI_PV_MAX: usize = 16;
}

/// The options this engine identifies during `uci`.
pub fn engine_options() -> Vec<EngineOption> {
    vec![
        EngineOption::new(
            EngineOptionName::HASH,
            UiElement::Spin,
            Some(EngineOptionDefaults::HASH_DEFAULT.to_string()),
            Some(EngineOptionDefaults::HASH_MIN.to_string()),
            Some(EngineOptionDefaults::HASH_MAX.to_string()),
        ),
        EngineOption::new(EngineOptionName::CLEAR_HASH, UiElement::Button, None, None, None),
        EngineOption::new(
            EngineOptionName::THREADS,
            UiElement::Spin,
            Some(EngineOptionDefaults::THREADS_DEFAULT.to_string()),
            Some(EngineOptionDefaults::THREADS_MIN.to_string()),
            Some(EngineOptionDefaults::THREADS_MAX.to_string()),
        ),
        EngineOption::new(
            EngineOptionName::MULTI_PV,
            UiElement::Spin,
            Some(EngineOptionDefaults::MULTI_PV_DEFAULT.to_string()),
            Some(EngineOptionDefaults::MULTI_PV_MIN.to_string()),
            Some(EngineOptionDefaults::MULTI_PV_MAX.to_string()),
        ),
    ]
}
