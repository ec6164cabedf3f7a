use crate::infra::{build_service, load_inventory};
use bed_switch::clock::{Clock, ManualClock};
use bed_switch::error::AppError;
use bed_switch::workflows::inventory::Inventory;
use bed_switch::workflows::switching::{
    outcome_message, Accommodation, Bed, InMemoryNotifier, InMemoryResources, Principal,
    RateLimiter, ResourceDirectory, SwitchError, SwitchNotice, SwitchSubmission,
};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Inventory CSV export to walk through (defaults to the bundled demo inventory)
    #[arg(long, value_parser = crate::infra::parse_path)]
    pub(crate) inventory: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct InventoryArgs {
    /// Inventory CSV export to summarize
    #[arg(value_parser = crate::infra::parse_path)]
    pub(crate) path: PathBuf,
}

/// One printed line of the walkthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DemoStep {
    pub(crate) scenario: &'static str,
    pub(crate) action: String,
    pub(crate) outcome: String,
    /// Error kind when the step was refused.
    pub(crate) refused: Option<&'static str>,
}

#[derive(Debug)]
pub(crate) struct Walkthrough {
    pub(crate) tenant: Accommodation,
    pub(crate) steps: Vec<DemoStep>,
    pub(crate) notices: Vec<SwitchNotice>,
}

/// Tenant whose property has at least two free beds, plus a neighbour to compete with.
#[derive(Debug)]
struct Cast {
    tenant: Accommodation,
    rival: Option<Accommodation>,
    first_choice: Bed,
    second_choice: Bed,
}

pub(crate) fn run_inventory(args: InventoryArgs) -> Result<(), AppError> {
    let inventory = load_inventory(Some(args.path.as_path()))?;
    let occupants = inventory
        .accommodations
        .snapshot()
        .map_err(SwitchError::from)?
        .len();
    let (resources, _) = inventory.into_parts();
    let resources = Arc::new(resources);
    let directory = ResourceDirectory::new(resources.clone());

    println!("Inventory summary for {}", args.path.display());
    println!("  Housed tenants: {}", occupants);

    for property in resources.properties().map_err(SwitchError::from)? {
        let location = [property.address, property.city, property.state]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        println!("\n{} ({})", property.name, property.id);
        if !location.is_empty() {
            println!("  {}", location);
        }

        let rooms = directory.list_available_rooms(&property.id)?;
        if rooms.is_empty() {
            println!("  No rooms with available beds");
            continue;
        }

        for availability in rooms {
            println!(
                "  - {} [{}]: {}/{} beds available",
                availability.room.name,
                availability.room.id,
                availability.available_beds,
                availability.total_beds
            );
            for bed in directory.list_available_beds(&property.id, &availability.room.id)? {
                let price = bed
                    .price
                    .map(|price| format!("${price}/month"))
                    .unwrap_or_else(|| "price not listed".to_string());
                println!("      {} [{}] {}", bed.name, bed.id, price);
            }
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let inventory = load_inventory(args.inventory.as_deref())?;

    println!("Room/bed switch request demo");
    let Some(walkthrough) = walkthrough(inventory, Utc::now())? else {
        println!("  No housed tenant has two free beds to choose from; nothing to demonstrate.");
        return Ok(());
    };

    println!(
        "  Tenant {} currently on bed {} (room {}, property {})",
        walkthrough.tenant.tenant_id,
        walkthrough.tenant.bed_id,
        walkthrough.tenant.room_id,
        walkthrough.tenant.property_id
    );

    let mut scenario = "";
    for step in &walkthrough.steps {
        if step.scenario != scenario {
            scenario = step.scenario;
            println!("\n{}", scenario);
        }
        match step.refused {
            Some(kind) => println!("  - {}: refused [{}] {}", step.action, kind, step.outcome),
            None => println!("  - {}: {}", step.action, step.outcome),
        }
    }

    println!("\nNotifications sent ({})", walkthrough.notices.len());
    for notice in &walkthrough.notices {
        let details = notice
            .details
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  - {:?} for {} -> {:?} ({})",
            notice.template, notice.request_id, notice.recipient, details
        );
    }

    Ok(())
}

/// Runs the submit, rate-limit, reject and approve scenarios against a fresh copy of the
/// inventory. Returns `None` when no tenant has two free beds to choose between.
pub(crate) fn walkthrough(
    inventory: Inventory,
    start: DateTime<Utc>,
) -> Result<Option<Walkthrough>, AppError> {
    let accommodations = inventory
        .accommodations
        .snapshot()
        .map_err(SwitchError::from)?;
    let notifier = Arc::new(InMemoryNotifier::default());
    let clock = Arc::new(ManualClock::new(start));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let service = build_service(
        inventory,
        notifier.clone(),
        RateLimiter::default(),
        shared_clock,
    );

    let Some(cast) = pick_cast(service.directory(), &accommodations)? else {
        return Ok(None);
    };

    let tenant = Principal::tenant(cast.tenant.tenant_id.as_str());
    let landlord = Principal::landlord("demo-landlord", [cast.tenant.property_id.as_str()]);
    let mut steps = Vec::new();

    let scenario = "Scenario 1: tenant submits a switch request";
    let first = service.submit(&tenant, submission(&cast.first_choice))?;
    steps.push(DemoStep {
        scenario,
        action: format!("submit {} for bed {}", first.request_id, cast.first_choice.id),
        outcome: outcome_message(&first),
        refused: None,
    });

    let scenario = "Scenario 4: second request inside the window";
    clock.advance(Duration::days(10));
    steps.push(attempt(
        scenario,
        format!("submit for bed {} ten days later", cast.second_choice.id),
        service
            .submit(&tenant, submission(&cast.second_choice))
            .map(|request| outcome_message(&request)),
    ));

    let scenario = "Scenario 3: landlord rejects";
    let rejected = service.reject(
        &landlord,
        &first.request_id,
        "Requested bed is held for an incoming lease",
    )?;
    steps.push(DemoStep {
        scenario,
        action: format!("reject {}", rejected.request_id),
        outcome: outcome_message(&rejected),
        refused: None,
    });

    let scenario = "Scenario 2: landlord approves";
    clock.advance(Duration::days(1));
    let retry = service.submit(&tenant, submission(&cast.first_choice))?;
    let competing = match &cast.rival {
        Some(rival) => {
            let rival = Principal::tenant(rival.tenant_id.as_str());
            let request = service.submit(&rival, submission(&cast.first_choice))?;
            steps.push(DemoStep {
                scenario,
                action: format!(
                    "neighbour submits {} for the same bed {}",
                    request.request_id, cast.first_choice.id
                ),
                outcome: outcome_message(&request),
                refused: None,
            });
            Some(request)
        }
        None => None,
    };

    let approved = service.approve(&landlord, &retry.request_id)?;
    steps.push(DemoStep {
        scenario,
        action: format!("approve {}", approved.request_id),
        outcome: outcome_message(&approved),
        refused: None,
    });

    if let Some(current) = service.current_assignment(&tenant)? {
        steps.push(DemoStep {
            scenario,
            action: "current assignment".to_string(),
            outcome: format!(
                "{} / {} / {}",
                current.property_name, current.room_name, current.bed_name
            ),
            refused: None,
        });
    }

    if let Some(competing) = competing {
        steps.push(attempt(
            scenario,
            format!("approve neighbour's {}", competing.request_id),
            service
                .approve(&landlord, &competing.request_id)
                .map(|request| outcome_message(&request)),
        ));
    }

    Ok(Some(Walkthrough {
        tenant: cast.tenant,
        steps,
        notices: notifier.notices(),
    }))
}

fn attempt(
    scenario: &'static str,
    action: String,
    result: Result<String, SwitchError>,
) -> DemoStep {
    match result {
        Ok(outcome) => DemoStep {
            scenario,
            action,
            outcome,
            refused: None,
        },
        Err(err) => DemoStep {
            scenario,
            action,
            outcome: err.to_string(),
            refused: Some(err.kind()),
        },
    }
}

fn submission(bed: &Bed) -> SwitchSubmission {
    SwitchSubmission {
        requested_room_id: bed.room_id.clone(),
        requested_bed_id: bed.id.clone(),
    }
}

fn pick_cast(
    directory: &ResourceDirectory<InMemoryResources>,
    accommodations: &[Accommodation],
) -> Result<Option<Cast>, SwitchError> {
    let mut fallback = None;

    for tenant in accommodations {
        let mut free = Vec::new();
        for availability in directory.list_available_rooms(&tenant.property_id)? {
            free.extend(directory.list_available_beds(&tenant.property_id, &availability.room.id)?);
        }
        let mut free = free.into_iter();
        let (Some(first_choice), Some(second_choice)) = (free.next(), free.next()) else {
            continue;
        };

        let rival = accommodations
            .iter()
            .find(|other| {
                other.property_id == tenant.property_id && other.tenant_id != tenant.tenant_id
            })
            .cloned();
        let candidate = Cast {
            tenant: tenant.clone(),
            rival,
            first_choice,
            second_choice,
        };

        if candidate.rival.is_some() {
            return Ok(Some(candidate));
        }
        fallback.get_or_insert(candidate);
    }

    Ok(fallback)
}
