//! Built-in handler variants.
//!
//! - `fogbugz`: files a FogBugz case per crash reason
//! - `email`: announces releases over SMTP

pub mod email;
pub mod fogbugz;

pub use email::{
    EmailFactory, EmailHandler, MailTransport, OutgoingMail, ReleaseTemplates, SmtpMailTransport,
};
pub use fogbugz::{FogbugzFactory, FogbugzHandler, FogbugzSession};
