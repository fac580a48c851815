use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use dispatch_core::conversation::ContactPolicy;
use dispatch_core::template::MessageTemplate;

/// Caller- and staff-facing texts.
#[derive(Debug, Clone)]
pub struct Templates {
    pub sms_staff: MessageTemplate,
    pub sms_sender_response: MessageTemplate,
    pub voice_connecting: MessageTemplate,
    pub voice_missed_call_staff: MessageTemplate,
    pub voice_missed_call_caller: MessageTemplate,
    pub voice_unavailable: MessageTemplate,
    pub voice_completed: MessageTemplate,
    pub schedule_reminder: MessageTemplate,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            sms_staff: "Dispatch message received\n\nFrom: {{from}}\nMessage: {{body}}\nTime: {{time}}\n\nTeam, please respond".into(),
            sms_sender_response: "Engaging staff. Please wait for a response.".into(),
            voice_connecting: "Connecting you to dispatch staff. Please hold.".into(),
            voice_missed_call_staff: "MISSED EMERGENCY CALL from {{from}} at {{time}}. Caller could not reach anyone by phone. Please respond immediately.".into(),
            voice_missed_call_caller: "Sorry, no dispatch staff are available to take your call right now. We have sent an urgent message to all staff members. Please try calling back in a few minutes or send a text message for assistance.".into(),
            voice_unavailable: "Sorry, no dispatch staff are currently available. Please try again later or send a text message.".into(),
            voice_completed: "Thank you for contacting dispatch.".into(),
            schedule_reminder: "Reminder: you are on call for dispatch starting today ({{date}}).".into(),
        }
    }
}

/// Per-component configuration, built once by the binary.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub policy: ContactPolicy,
    /// Zone in which schedule times and template timestamps are read.
    pub timezone: Tz,
    /// Budget shared by all store operations of one inbound event.
    pub timeout: Duration,
    pub dial_timeout_secs: u32,
    pub templates: Templates,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            policy: ContactPolicy::default(),
            timezone: Tz::UTC,
            timeout: Duration::from_secs(60),
            dial_timeout_secs: 20,
            templates: Templates::default(),
        }
    }
}

impl RelaySettings {
    /// `{{time}}` value for templates, e.g. "Wed, 15 Jan 2025 10:00:00 PST".
    pub fn format_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.timezone)
            .format("%a, %d %b %Y %H:%M:%S %Z")
            .to_string()
    }
}
