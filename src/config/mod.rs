mod settings;

pub use settings::{
    Command, Config, DetectionSettings, HookSettings, Settings, UsageSettings, WebSettings,
};
