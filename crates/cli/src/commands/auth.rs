//! Sign-in, sign-out, and account creation.
//!
//! # Usage
//!
//! ```bash
//! merysalud login -u maria            # password read from stdin
//! merysalud register -u maria -e maria@gmail.com -t 999888777
//! merysalud whoami
//! merysalud logout
//! ```

use merysalud_client::{AuthError, PharmacyClient, Registration};

use super::{CommandError, read_secret};

/// Sign in and keep the session in the state file.
pub async fn login(
    client: &PharmacyClient,
    username: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = read_secret(password, "password")?;
    let profile = client.auth().login(username, &password).await?;
    print_signed_in(&profile.display_name, profile.role.as_str());
    Ok(())
}

/// Forget the stored session.
pub async fn logout(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    client.auth().logout().await?;
    Ok(())
}

/// Create an account; prints every invalid field when the form is rejected.
pub async fn register(
    client: &PharmacyClient,
    username: String,
    email: String,
    telefono: String,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registration = Registration {
        username,
        email,
        password: read_secret(password, "password")?,
        telefono,
    };
    match client.auth().register(&registration).await {
        Ok(account) => {
            tracing::info!(user_id = %account.id, "Account created");
            print_registered(&account.username);
            Ok(())
        }
        Err(AuthError::Validation(errors)) => {
            for error in &errors {
                tracing::error!(field = error.field, "{}", error.message);
            }
            Err(AuthError::Validation(errors).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Show who the backend thinks is signed in.
pub async fn whoami(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    let Some(profile) = client.session().profile().await else {
        return Err(CommandError::NotSignedIn.into());
    };
    let account = client.auth().current_user().await?;
    print_whoami(
        &account.username,
        profile.role.as_str(),
        account.email.as_deref(),
        account.telefono.as_deref(),
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_signed_in(name: &str, role: &str) {
    println!("Signed in as {name} ({role})");
}

#[allow(clippy::print_stdout)]
fn print_registered(username: &str) {
    println!("Account {username} created. Sign in with `merysalud login -u {username}`.");
}

#[allow(clippy::print_stdout)]
fn print_whoami(username: &str, role: &str, email: Option<&str>, phone: Option<&str>) {
    println!("{username} ({role})");
    if let Some(email) = email {
        println!("  email:    {email}");
    }
    if let Some(phone) = phone {
        println!("  teléfono: {phone}");
    }
}
