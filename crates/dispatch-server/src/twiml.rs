//! TwiML documents for webhook replies.

use dispatch_ports::types::{DialPlan, Reply};

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Status callback for a live transfer; carries the token and the caller
/// so the follow-up request can be authenticated and paged.
fn status_callback(token: &str, plan: &DialPlan) -> String {
    let query = serde_urlencoded::to_string([("token", token), ("from", plan.caller.as_str())])
        .unwrap_or_default();
    format!("/voice-status?{query}")
}

pub fn render(reply: &Reply, token: &str) -> String {
    let body = match reply {
        Reply::Empty => String::new(),
        Reply::Message(text) => format!("<Message>{}</Message>", escape(text)),
        Reply::Say(text) => format!("<Say>{}</Say>", escape(text)),
        Reply::Dial(plan) => {
            let numbers: String = plan
                .numbers
                .iter()
                .map(|n| format!("<Number>{}</Number>", escape(n.as_str())))
                .collect();
            format!(
                r#"<Say>{}</Say><Dial timeout="{}" callerId="{}" action="{}">{}</Dial>"#,
                escape(&plan.greeting),
                plan.timeout_secs,
                escape(plan.caller_id.as_str()),
                escape(&status_callback(token, plan)),
                numbers
            )
        }
    };
    format!("{HEADER}<Response>{body}</Response>")
}
