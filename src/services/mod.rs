// SPDX-License-Identifier: MIT

//! Services module - external collaborators and the accrual job.

pub mod accrual;
pub mod identity;
pub mod mailer;

pub use identity::{IdentityService, VerifiedUser};
pub use mailer::MailerService;
