//! Catalog browsing. Lookups print nothing rather than fail when the
//! backend is down.

use merysalud_client::PharmacyClient;
use merysalud_core::{Product, ProductId};

use super::CommandError;

pub async fn list(client: &PharmacyClient) {
    print_products(&client.products().list().await);
}

pub async fn search(client: &PharmacyClient, keyword: &str) {
    print_products(&client.products().search(keyword).await);
}

pub async fn category(client: &PharmacyClient, name: &str) {
    print_products(&client.products().by_category(name).await);
}

pub async fn show(client: &PharmacyClient, id: ProductId) -> Result<(), CommandError> {
    let product = client
        .products()
        .get(id)
        .await
        .ok_or_else(|| CommandError::InvalidArgument {
            field: "product",
            message: format!("no product with id {id}"),
        })?;
    print_product(&product);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products");
        return;
    }
    for p in products {
        let availability = if p.is_available() { "" } else { "  (agotado)" };
        println!("{:>6}  {:<40} {:>12}{availability}", p.id, p.name, p.price.to_string());
    }
}

#[allow(clippy::print_stdout)]
fn print_product(p: &Product) {
    println!("{} {}", p.id, p.name);
    println!("  precio:       {}", p.price);
    println!("  stock:        {}", p.stock);
    if let Some(categoria) = &p.categoria {
        println!("  categoría:    {categoria}");
    }
    if let Some(presentacion) = &p.presentacion {
        println!("  presentación: {presentacion}");
    }
    if let Some(principio) = &p.principio_activo {
        println!("  principio:    {principio}");
    }
    if let Some(description) = &p.description {
        println!("  {description}");
    }
}
