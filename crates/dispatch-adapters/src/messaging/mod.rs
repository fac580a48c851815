mod twilio;

pub use twilio::TwilioSender;
