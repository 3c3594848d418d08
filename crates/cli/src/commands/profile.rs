//! Own-account commands.

use merysalud_client::PharmacyClient;
use merysalud_core::Phone;

use super::{CommandError, read_secret};

#[allow(clippy::print_stdout)]
pub async fn show(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    let account = client.profile().get().await?;
    println!("{} (id {})", account.username, account.id);
    println!("  email:    {}", account.email.as_deref().unwrap_or("-"));
    println!("  teléfono: {}", account.telefono.as_deref().unwrap_or("-"));
    Ok(())
}

/// Update name and/or phone. The phone is checked locally first.
pub async fn update(
    client: &PharmacyClient,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    if name.is_none() && phone.is_none() {
        return Err(CommandError::InvalidArgument {
            field: "profile",
            message: "give --name, --phone, or both".to_owned(),
        }
        .into());
    }
    let phone = phone
        .map(Phone::parse)
        .transpose()
        .map_err(|e| CommandError::InvalidArgument {
            field: "phone",
            message: e.to_string(),
        })?;

    client.profile().update(name, phone.as_ref()).await?;
    show(client).await
}

/// Change password. Reads the current and the new password from stdin, one
/// per line.
pub async fn change_password(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    let current = read_secret(None, "current password")?;
    let new = read_secret(None, "new password")?;
    client.profile().change_password(&current, &new).await?;
    tracing::info!("Password updated");
    Ok(())
}
