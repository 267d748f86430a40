//! Progress and listing lines written to the console.
//!
//! Every writer takes `&mut impl Write` so runs can be captured in tests.

use crate::models::{Site, Subscription};
use colored::Colorize;
use std::io::{self, Write};

/// Start a progress line, finished later by [`done`] or [`failed`].
pub fn progress<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    write!(out, "{message} ... ")?;
    out.flush()
}

pub fn done<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "done!".green())
}

pub fn failed<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "failed!".red())
}

pub fn user_tenants<W: Write>(out: &mut W, user_id: &str, count: usize) -> io::Result<()> {
    writeln!(out, "User {user_id} has {count} tenants")
}

pub fn list_subscriptions<W: Write>(out: &mut W, tenant_id: &str) -> io::Result<()> {
    progress(out, &format!("List subscriptions for tenant {tenant_id}"))
}

pub fn subscriptions_found<W: Write>(out: &mut W, subscriptions: &[Subscription]) -> io::Result<()> {
    writeln!(out, "{} subscriptions found!", subscriptions.len())?;
    for s in subscriptions {
        writeln!(out, "Subscription: {} ({})", s.display_name, s.subscription_id)?;
    }
    writeln!(out)
}

pub fn list_sites<W: Write>(out: &mut W, subscription: &Subscription) -> io::Result<()> {
    progress(
        out,
        &format!(
            "List sites for subscription {} ({})",
            subscription.display_name, subscription.subscription_id
        ),
    )
}

pub fn sites_found<W: Write>(out: &mut W, sites: &[Site]) -> io::Result<()> {
    writeln!(out, "{} sites found!", sites.len())?;
    for site in sites {
        writeln!(out, "Site: {site}")?;
    }
    writeln!(out)
}
