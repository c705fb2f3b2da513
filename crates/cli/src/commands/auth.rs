//! Session commands: login, register, logout, whoami.
//!
//! The password is read from `SHOPSWIFT_PASSWORD` when set, otherwise from
//! one line of stdin.

use std::io::{self, BufRead, Write};

use secrecy::SecretString;

use super::{CommandError, Context, flush_notices, output};

const PASSWORD_VAR: &str = "SHOPSWIFT_PASSWORD";

fn read_password() -> Result<SecretString, CommandError> {
    if let Ok(password) = std::env::var(PASSWORD_VAR) {
        return Ok(SecretString::from(password));
    }

    let mut stderr = io::stderr().lock();
    write!(stderr, "Password: ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(CommandError::InvalidArgument(
            "password must not be empty".to_owned(),
        ));
    }
    Ok(SecretString::from(password))
}

/// Sign in and persist the token.
///
/// # Errors
///
/// Returns an error if the credentials are rejected or the server is
/// unreachable.
pub async fn login(ctx: &Context, email: &str) -> Result<(), CommandError> {
    let password = read_password()?;
    let mut notices = ctx.session.notices();

    let result = ctx.session.login(email, &password).await;

    flush_notices(&mut notices, &mut io::stdout().lock())?;
    result?;
    Ok(())
}

/// Create an account and sign in.
///
/// # Errors
///
/// Returns an error for a malformed email or if the server refuses the
/// registration.
pub async fn register(ctx: &Context, email: &str, name: Option<&str>) -> Result<(), CommandError> {
    let password = read_password()?;
    let mut notices = ctx.session.notices();

    let result = ctx.session.register(email, &password, name).await;

    flush_notices(&mut notices, &mut io::stdout().lock())?;
    result?;
    Ok(())
}

/// Sign out.
///
/// # Errors
///
/// Only fails if output cannot be written.
pub fn logout(ctx: &Context) -> Result<(), CommandError> {
    let mut notices = ctx.session.notices();
    ctx.session.logout();
    flush_notices(&mut notices, &mut io::stdout().lock())?;
    Ok(())
}

/// Show the signed-in account.
///
/// # Errors
///
/// Returns `CommandError::NotSignedIn` without a valid session.
pub async fn whoami(ctx: &Context) -> Result<(), CommandError> {
    ctx.signed_in().await?;
    let user = ctx.session.require_user()?;
    output::user(&mut io::stdout().lock(), &user)?;
    Ok(())
}
