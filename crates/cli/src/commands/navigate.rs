//! Dry-run the navigation gate for a page path.

use merysalud_client::{PharmacyClient, Verdict};

/// Print what navigating to `path` would do.
#[allow(clippy::print_stdout)]
pub async fn run(client: &PharmacyClient, path: &str) {
    let navigation = client.gate().navigate(path).await;
    println!("access: {:?}", navigation.access);
    println!("state:  {:?}", navigation.state);
    match navigation.verdict {
        Verdict::Render {
            user: Some(user),
            navbar,
        } => println!("render {path} for {} with {navbar:?} navbar", user.display_name),
        Verdict::Render { user: None, navbar } => {
            println!("render {path} anonymously with {navbar:?} navbar");
        }
        Verdict::Redirect { to } => println!("redirect to {to}"),
        Verdict::SessionExpired { login } => println!("session expired, sign in at {login}"),
    }
}
