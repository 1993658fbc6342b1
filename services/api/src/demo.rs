use crate::infra::DemoBackend;
use clap::Args;
use noc_console::error::AppError;
use noc_console::workflows::console::Console;
use noc_console::workflows::noc::{ApplicationId, FeedFilter, RecipientCatalog, StatusFilter};
use noc_console::workflows::notice::{ConsoleCommand, Notice};
use noc_console::workflows::registry::{EntityId, EntityKind};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Vendor id whose backend calls fail during the bulk delete. Defaults to `v2`.
    #[arg(long)]
    pub(crate) fail_vendor: Option<String>,
    /// Print the transition history as JSON at the end.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let backend = Arc::new(DemoBackend::seeded());
    backend.fail_for(args.fail_vendor.as_deref().unwrap_or("v2"));
    let console = Console::new(backend.clone(), Arc::new(RecipientCatalog::standard()));

    println!("NOC review console demo");
    console.reviews().refresh().await?;
    let pending = console.reviews().feed(&FeedFilter {
        status: StatusFilter::Pending,
        ..FeedFilter::default()
    });
    println!("\nPending applications ({})", pending.len());
    for application in &pending {
        println!(
            "  {} | {} | {} | {}",
            application.application_number,
            application.status,
            application.filmmaker.name,
            application.created_at.format("%Y-%m-%d")
        );
    }

    let target = ApplicationId::from("65f1c0");
    println!("\nForwarding");
    let confirmation = console.confirmation(ConsoleCommand::ForwardApplication {
        application_id: target.clone(),
        departments: vec![101, 121],
        districts: vec![20],
    });
    confirm_and_dispatch(&console, confirmation).await;

    println!("\nRejection");
    let blank = ConsoleCommand::RejectApplication {
        application_id: target.clone(),
        remarks: "   ".to_string(),
    };
    print_notice("  blank remarks", &console.dispatch(blank).await);
    let confirmation = console.confirmation(ConsoleCommand::RejectApplication {
        application_id: target,
        remarks: "Shooting schedule overlaps with the state festival".to_string(),
    });
    confirm_and_dispatch(&console, confirmation).await;

    println!("\nArtist verification");
    console.registry().refresh(EntityKind::Artist).await?;
    let verify = ConsoleCommand::SetVerified {
        kind: EntityKind::Artist,
        entity_id: EntityId::from(7),
        verified: true,
    };
    print_notice("  verify 7", &console.dispatch(verify).await);
    backend.fail_for("a8");
    let unverify = ConsoleCommand::SetVerified {
        kind: EntityKind::Artist,
        entity_id: EntityId::from("a8"),
        verified: false,
    };
    print_notice("  unverify a8", &console.dispatch(unverify).await);
    for artist in console.registry().entities(EntityKind::Artist) {
        println!(
            "  {} {} verified={}",
            artist.id,
            artist.name,
            artist.is_verified()
        );
    }

    println!("\nVendor cleanup");
    console.registry().refresh(EntityKind::Vendor).await?;
    let ids = console
        .registry()
        .entities(EntityKind::Vendor)
        .into_iter()
        .map(|vendor| vendor.id)
        .collect();
    let confirmation = console.confirmation(ConsoleCommand::DeleteEntities {
        kind: EntityKind::Vendor,
        ids,
    });
    confirm_and_dispatch(&console, confirmation).await;
    let remaining: Vec<String> = console
        .registry()
        .entities(EntityKind::Vendor)
        .into_iter()
        .map(|vendor| vendor.id.to_string())
        .collect();
    println!("  Remaining vendors: {}", display_list(&remaining));

    let history = console.reviews().history();
    if args.json {
        match serde_json::to_string_pretty(&history) {
            Ok(json) => println!("\nTransition history:\n{}", json),
            Err(err) => println!("\nTransition history unavailable: {}", err),
        }
    } else {
        println!("\nTransition history");
        for record in history {
            println!(
                "  {} {}: {} -> {} ({} recipient(s))",
                record.application_number,
                record.transition.verb(),
                record.from,
                record.to,
                record.recipient_count()
            );
        }
    }

    Ok(())
}

async fn confirm_and_dispatch(console: &Console<DemoBackend>, mut confirmation: Notice) {
    print_notice("  confirm", &confirmation);
    match confirmation.accept() {
        Some(command) => print_notice("  outcome", &console.dispatch(command).await),
        None => println!("  Nothing queued"),
    }
}

fn print_notice(label: &str, notice: &Notice) {
    match (notice.level(), notice.message()) {
        (Some(level), Some(message)) => println!("{label} [{level:?}] {message}"),
        _ => println!("{label} (closed)"),
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
