//! Built-in filesystem executors.
//!
//! The local adapter pair is the one executor shipped with the kit. It is
//! useful on its own for directory-to-directory flows and doubles as the
//! reference implementation of the executor contract; network protocols
//! (SFTP, mail) live in their own crates and register alongside it.

mod local;

pub use self::local::{LocalFileConfig, LocalFileReceiver, LocalFileSender};
