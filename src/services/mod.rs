// SPDX-License-Identifier: MIT

//! External collaborator services.

pub mod mail;

pub use mail::MailService;
