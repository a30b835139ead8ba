pub mod mailer;
pub mod notify;
pub mod rate_limit;
