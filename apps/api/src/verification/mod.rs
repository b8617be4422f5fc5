pub mod code;
pub mod handlers;
pub mod machine;
pub mod mailer;
