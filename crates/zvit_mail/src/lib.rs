pub mod message;
pub mod source;

pub use source::maildir::MaildirSource;
pub use source::mbox::MboxSource;
pub use source::{AlertSource, FetchedAlerts};
