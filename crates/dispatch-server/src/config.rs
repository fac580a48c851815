//! Layered configuration: compiled defaults, then `dispatch.toml` (or the
//! file named by `DISPATCH_CONFIG`), then `DISPATCH_*` environment variables.

use std::time::Duration;

use anyhow::{bail, Context};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use dispatch_app::settings::{RelaySettings, Templates};
use dispatch_core::conversation::{ContactPolicy, NotificationStrategy};
use dispatch_core::phone::Phone;
use dispatch_core::template::MessageTemplate;
use dispatch_ports::types::PhoneNumberConfig;

const DEFAULT_CONFIG_FILE: &str = "dispatch.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Shared secret expected in the `token` query parameter.
    pub auth_token: String,
    pub timezone: String,
    pub timeout_secs: u64,
    pub notification_strategy: String,
    pub notification_methods: Vec<String>,
    /// Lets staff phones test the relay as if they were public callers.
    pub skip_staff_ignore: bool,
    pub inbound_number: Option<String>,
    pub outbound_number: Option<String>,
    pub twilio: TwilioConfig,
    pub templates: TemplateConfig,
    pub reminder: ReminderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4514,
            database_url: "sqlite://dispatch.db?mode=rwc".into(),
            auth_token: String::new(),
            timezone: "UTC".into(),
            timeout_secs: 60,
            notification_strategy: "THREAD".into(),
            notification_methods: vec!["SMS".into()],
            skip_staff_ignore: false,
            inbound_number: None,
            outbound_number: None,
            twilio: TwilioConfig::default(),
            templates: TemplateConfig::default(),
            reminder: ReminderConfig::default(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[redacted]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub sms_staff: String,
    pub sms_sender_response: String,
    pub voice_connecting: String,
    pub voice_missed_call_staff: String,
    pub voice_missed_call_caller: String,
    pub voice_unavailable: String,
    pub voice_completed: String,
    pub schedule_reminder: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        let t = Templates::default();
        Self {
            sms_staff: t.sms_staff.as_str().into(),
            sms_sender_response: t.sms_sender_response.as_str().into(),
            voice_connecting: t.voice_connecting.as_str().into(),
            voice_missed_call_staff: t.voice_missed_call_staff.as_str().into(),
            voice_missed_call_caller: t.voice_missed_call_caller.as_str().into(),
            voice_unavailable: t.voice_unavailable.as_str().into(),
            voice_completed: t.voice_completed.as_str().into(),
            schedule_reminder: t.schedule_reminder.as_str().into(),
        }
    }
}

impl TemplateConfig {
    fn to_templates(&self) -> Templates {
        Templates {
            sms_staff: MessageTemplate::new(&self.sms_staff),
            sms_sender_response: MessageTemplate::new(&self.sms_sender_response),
            voice_connecting: MessageTemplate::new(&self.voice_connecting),
            voice_missed_call_staff: MessageTemplate::new(&self.voice_missed_call_staff),
            voice_missed_call_caller: MessageTemplate::new(&self.voice_missed_call_caller),
            voice_unavailable: MessageTemplate::new(&self.voice_unavailable),
            voice_completed: MessageTemplate::new(&self.voice_completed),
            schedule_reminder: MessageTemplate::new(&self.schedule_reminder),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: bool,
    /// Local hour from which the daily pass may run.
    pub hour: u32,
    pub poll_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 8,
            poll_secs: 60,
        }
    }
}

/// Which inbound channels get webhook routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub sms: bool,
    pub voice: bool,
}

pub fn load() -> Result<Config, figment::Error> {
    let path = std::env::var("DISPATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

#[cfg(test)]
pub fn load_from_str(toml: &str) -> Result<Config, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml))
        .extract()
}

fn env_provider() -> Env {
    Env::prefixed("DISPATCH_").map(|key| env_key(key.as_str()).into())
}

/// Maps a lowercased env name (prefix stripped) onto a config path, e.g.
/// `twilio_auth_token` to `twilio.auth_token`.
fn env_key(key: &str) -> String {
    for section in ["twilio_", "templates_", "reminder_"] {
        if let Some(rest) = key.strip_prefix(section) {
            return format!("{}.{rest}", section.trim_end_matches('_'));
        }
    }
    key.to_string()
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth_token.trim().is_empty() {
            bail!("auth_token must be set");
        }
        self.strategy()?;
        self.tz()?;
        self.channels()?;
        self.phone_numbers()?;
        if self.reminder.hour >= 24 {
            bail!("reminder.hour must be below 24, got {}", self.reminder.hour);
        }
        if self.twilio.account_sid.is_empty() || self.twilio.auth_token.is_empty() {
            bail!("twilio.account_sid and twilio.auth_token must be set");
        }
        Ok(())
    }

    pub fn strategy(&self) -> anyhow::Result<NotificationStrategy> {
        Ok(self.notification_strategy.parse()?)
    }

    pub fn tz(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown timezone: {}", self.timezone))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn channels(&self) -> anyhow::Result<Channels> {
        let mut channels = Channels {
            sms: false,
            voice: false,
        };
        for method in &self.notification_methods {
            match method.trim().to_ascii_uppercase().as_str() {
                "SMS" => channels.sms = true,
                "VOICE" => channels.voice = true,
                other => bail!("unknown notification method: {other}"),
            }
        }
        Ok(channels)
    }

    /// Provider numbers to seed into the config store, if both are set.
    pub fn phone_numbers(&self) -> anyhow::Result<Option<PhoneNumberConfig>> {
        match (&self.inbound_number, &self.outbound_number) {
            (Some(inbound), Some(outbound)) => Ok(Some(PhoneNumberConfig {
                inbound: Phone::new(inbound).context("invalid inbound_number")?,
                outbound: Phone::new(outbound).context("invalid outbound_number")?,
            })),
            (None, None) => Ok(None),
            _ => bail!("inbound_number and outbound_number must be set together"),
        }
    }

    pub fn relay_settings(&self) -> anyhow::Result<RelaySettings> {
        Ok(RelaySettings {
            policy: ContactPolicy {
                strategy: self.strategy()?,
                skip_staff_ignore: self.skip_staff_ignore,
            },
            timezone: self.tz()?,
            timeout: self.timeout(),
            templates: self.templates.to_templates(),
            ..RelaySettings::default()
        })
    }
}
