//! Checkout and order workflows for customers, admins, and couriers.

use merysalud_client::PharmacyClient;
use merysalud_core::{Order, OrderId, OrderStatus, ShippingDetails, UserAccount, UserId};

use super::CommandError;

/// Place an order from the remote cart.
///
/// Address and district go together; the backend falls back to the account's
/// default address when neither is given.
pub async fn checkout(
    client: &PharmacyClient,
    address: Option<String>,
    district: Option<String>,
    reference: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !client.session().is_authenticated().await {
        return Err(CommandError::NotSignedIn.into());
    }
    let shipping = match (address, district) {
        (Some(shipping_address), Some(shipping_district)) => Some(ShippingDetails {
            shipping_address,
            shipping_district,
            shipping_reference: reference,
        }),
        (None, None) => None,
        _ => {
            return Err(CommandError::InvalidArgument {
                field: "shipping",
                message: "--address and --district must be given together".to_owned(),
            }
            .into());
        }
    };

    let order = client.orders().create(shipping.as_ref()).await?;
    print_order(&order);
    Ok(())
}

pub async fn mine(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    print_orders(&client.orders().mine().await?);
    Ok(())
}

pub async fn show(client: &PharmacyClient, id: OrderId) -> Result<(), Box<dyn std::error::Error>> {
    print_order(&client.orders().get(id).await?);
    Ok(())
}

pub async fn all(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    print_orders(&client.orders().all().await?);
    Ok(())
}

pub async fn set_status(
    client: &PharmacyClient,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    print_order(&client.orders().update_status(id, status).await?);
    Ok(())
}

pub async fn assign(
    client: &PharmacyClient,
    id: OrderId,
    courier: UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    print_order(&client.orders().assign_delivery(id, courier).await?);
    Ok(())
}

pub async fn unassigned(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    print_orders(&client.orders().unassigned().await?);
    Ok(())
}

pub async fn couriers(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    print_couriers(&client.orders().available_couriers().await?);
    Ok(())
}

pub async fn deliveries(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    print_orders(&client.orders().my_deliveries().await?);
    Ok(())
}

pub async fn deliver(
    client: &PharmacyClient,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    print_order(&client.orders().update_delivery_status(id, status).await?);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn stats(client: &PharmacyClient) -> Result<(), Box<dyn std::error::Error>> {
    let stats = client.orders().delivery_stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders");
        return;
    }
    for order in orders {
        let created = order
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:<14} {:<11} {:>12}  {created}",
            order.reference(),
            order.status.to_string(),
            order.total_amount.to_string(),
        );
    }
}

#[allow(clippy::print_stdout)]
fn print_order(order: &Order) {
    println!("Pedido {} ({})", order.reference(), order.status);
    if let Some(user) = order.user.as_ref().and_then(|u| u.username.as_deref()) {
        println!("  cliente:    {user}");
    }
    if let Some(address) = &order.shipping_address {
        let district = order.shipping_district.as_deref().unwrap_or_default();
        println!("  dirección:  {address}, {district}");
    }
    if let Some(courier) = &order.repartidor {
        println!(
            "  repartidor: {}",
            courier.username.as_deref().unwrap_or("sin nombre")
        );
    }
    for item in &order.items {
        println!(
            "  {:>3} x {:<36} {:>10}",
            item.quantity,
            item.product.name,
            item.line_total().to_string(),
        );
    }
    println!("  total:      {}", order.total_amount);
}

#[allow(clippy::print_stdout)]
fn print_couriers(couriers: &[UserAccount]) {
    if couriers.is_empty() {
        println!("No couriers available");
        return;
    }
    for courier in couriers {
        println!(
            "{:>6}  {:<24} {}",
            courier.id,
            courier.username,
            courier.telefono.as_deref().unwrap_or("-")
        );
    }
}
