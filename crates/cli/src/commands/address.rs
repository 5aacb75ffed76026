//! Address book commands.

use clap::Subcommand;
use redthread_client::AppState;
use redthread_client::types::{CreateAddressRequest, UpdateAddressRequest};
use redthread_core::AddressId;

use super::CommandError;

#[derive(Subcommand)]
pub enum AddressAction {
    /// List your addresses
    List,
    /// Register an address
    Add {
        #[arg(long)]
        line1: String,
        #[arg(long)]
        line2: Option<String>,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        zip: String,
        #[arg(long, default_value = "Chile")]
        country: String,
        /// Make it the default shipping address
        #[arg(long)]
        default: bool,
    },
    /// Change some fields of an address
    Update {
        id: AddressId,
        #[arg(long)]
        line1: Option<String>,
        #[arg(long)]
        line2: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        default: Option<bool>,
    },
    /// Delete an address
    Delete { id: AddressId },
}

pub async fn run(app: &AppState, action: AddressAction) -> Result<(), CommandError> {
    let addresses = app.addresses();

    match action {
        AddressAction::List => {
            let list = addresses.list().await?;
            if list.is_empty() {
                println!("No addresses. Add one with `address add`.");
            }
            for address in list {
                let marker = if address.default { " (default)" } else { "" };
                println!("{}  {}{marker}", address.id, address.one_line());
            }
        }
        AddressAction::Add {
            line1,
            line2,
            city,
            state,
            zip,
            country,
            default,
        } => {
            let req = CreateAddressRequest {
                line1,
                line2,
                city,
                state,
                zip,
                country,
                default,
            };
            let address = addresses.create(&req).await?;
            println!("Address #{} saved: {}", address.id, address.one_line());
        }
        AddressAction::Update {
            id,
            line1,
            line2,
            city,
            state,
            zip,
            country,
            default,
        } => {
            let req = UpdateAddressRequest {
                line1,
                line2,
                city,
                state,
                zip,
                country,
                default,
            };
            let address = addresses.update(id, &req).await?;
            println!("Address #{} updated: {}", address.id, address.one_line());
        }
        AddressAction::Delete { id } => {
            addresses.delete(id).await?;
            println!("Address #{id} deleted");
        }
    }
    Ok(())
}
