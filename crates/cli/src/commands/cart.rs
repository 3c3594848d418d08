//! Cart commands. The cart is remote when signed in and kept in the state
//! file otherwise.

use merysalud_client::{CartError, PharmacyClient};
use merysalud_core::{LineItem, Price, ProductId};

use super::CommandError;

pub async fn show(client: &PharmacyClient) -> Result<(), CartError> {
    let items = client.cart().get().await?;
    print_cart(&items);
    Ok(())
}

pub async fn add(
    client: &PharmacyClient,
    id: ProductId,
    quantity: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if !client.cart().add(id, quantity).await? {
        return Err(CommandError::InvalidArgument {
            field: "product",
            message: format!("could not add product {id}"),
        }
        .into());
    }
    show(client).await?;
    Ok(())
}

pub async fn set(client: &PharmacyClient, id: ProductId, quantity: u32) -> Result<(), CartError> {
    client.cart().set_quantity(id, quantity).await?;
    show(client).await
}

pub async fn clear(client: &PharmacyClient) -> Result<(), CartError> {
    client.cart().clear().await?;
    show(client).await
}

#[allow(clippy::print_stdout)]
fn print_cart(items: &[LineItem]) {
    if items.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in items {
        println!(
            "{:>6}  {:<40} {:>3} x {:>10} = {:>10}",
            line.product_id,
            line.name,
            line.quantity,
            line.unit_price.to_string(),
            line.subtotal().to_string(),
        );
    }
    let total: Price = items.iter().map(LineItem::subtotal).sum();
    println!("Total: {total}");
}
