use crate::infra::InMemoryAuditSink;
use chrono::SecondsFormat;
use clap::Args;
use mentor_match::config::AppConfig;
use mentor_match::error::AppError;
use mentor_match::matching::{
    DemandId, DemandProfileDraft, MatchingConfig, MatchingError, MatchingService,
    MemoryMatchingStore, RecommendQuery, SupplyId, SupplyProfileDraft,
};
use std::sync::Arc;
use std::thread;

type DemoService = MatchingService<MemoryMatchingStore, InMemoryAuditSink>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Capacity of the contested mentor in the accept race (defaults to 2).
    #[arg(long)]
    pub(crate) capacity: Option<u32>,
    /// Number of mentees racing for the contested mentor (defaults to 5).
    #[arg(long)]
    pub(crate) contenders: Option<usize>,
    /// Print the ranked recommendations as JSON instead of a table.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        capacity,
        contenders,
        json,
    } = args;

    let config = AppConfig::load()
        .map(|config| config.matching)
        .unwrap_or_else(|_| MatchingConfig::default());
    let capacity = capacity.unwrap_or(2).max(1);
    let contenders = contenders.unwrap_or(5).max(capacity as usize);

    let audit = Arc::new(InMemoryAuditSink::default());
    let service = Arc::new(MatchingService::new(
        Arc::new(MemoryMatchingStore::new()),
        audit.clone(),
        config,
    ));

    println!("Mentor matching demo");
    let contested = seed_mentor(
        &service,
        "mentor-tax",
        "Tax Law",
        "tax audits finance",
        capacity,
    )?;
    seed_mentor(&service, "mentor-ip", "IP Law", "patents licensing", 3)?;
    seed_mentor(&service, "mentor-trusts", "Tax Law", "trusts estates", 3)?;

    let lead = seed_mentee(&service, "mentee-lead")?;
    let ranked = service.recommend(&lead, &RecommendQuery::default())?;
    if json {
        match serde_json::to_string_pretty(&ranked) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("  Recommendations unavailable: {err}"),
        }
    } else {
        println!("\nRecommendations for {}", lead);
        for entry in &ranked {
            println!(
                "  - {}: {:.2} (category {:.0} | level {:.0} | interests {:.2} | location {:.0} | language {:.0}) {} slot(s) free",
                entry.supply_id,
                entry.score,
                entry.components.category,
                entry.components.level,
                entry.components.interests,
                entry.components.location,
                entry.components.language,
                entry.profile.available_slots
            );
        }
    }

    println!(
        "\nAccept race: {} mentees, {} slot(s) at {}",
        contenders, capacity, contested
    );
    let mut proposals = Vec::with_capacity(contenders);
    for index in 0..contenders {
        let demand_id = seed_mentee(&service, &format!("mentee-{index:02}"))?;
        let proposal =
            service.create_proposal(&demand_id, &contested, Some("Keen to learn".to_string()))?;
        println!(
            "  - {} proposed at {}",
            proposal.proposal_id,
            proposal
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        proposals.push(proposal.proposal_id);
    }

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = proposals
            .iter()
            .map(|proposal_id| {
                let service = &service;
                let contested = &contested;
                scope.spawn(move || {
                    (
                        proposal_id.clone(),
                        service.accept_proposal(proposal_id, contested, None),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .collect()
    });

    let mut leftovers = Vec::new();
    for (proposal_id, outcome) in outcomes {
        match outcome {
            Ok(accepted) => println!(
                "  - {} accepted -> assignment {}",
                proposal_id, accepted.assignment.assignment_id
            ),
            Err(MatchingError::NoCapacity { .. }) => {
                println!("  - {} refused: no capacity, left pending", proposal_id);
                leftovers.push(proposal_id);
            }
            Err(err) => println!("  - {} failed: {}", proposal_id, err),
        }
    }

    let snapshot = service.capacity(&contested)?;
    println!(
        "  Capacity after race: {}/{} active, {} available",
        snapshot.active, snapshot.maximum, snapshot.available
    );

    println!("\nDeclining the remaining proposals");
    for proposal_id in &leftovers {
        let outcome =
            service.decline_proposal(proposal_id, &contested, Some("At capacity".to_string()))?;
        match outcome.retry_credits {
            Some(credits) => println!(
                "  - {} declined; {} now holds {}/{} retry credit(s)",
                proposal_id, outcome.proposal.demand_id, credits.used, credits.max
            ),
            None => println!("  - {} declined", proposal_id),
        }
    }

    let events = audit.events();
    println!("\nAudit trail ({} events)", events.len());
    for event in events {
        println!("  - {} {}", event.action, event.proposal_id);
    }

    Ok(())
}

fn seed_mentor(
    service: &DemoService,
    id: &str,
    category: &str,
    expertise: &str,
    capacity: u32,
) -> Result<SupplyId, MatchingError> {
    let supply_id = SupplyId(id.to_string());
    service.save_supply_profile(
        supply_id.clone(),
        SupplyProfileDraft {
            category: category.to_string(),
            level: "JD".to_string(),
            expertise: expertise.to_string(),
            language: "english".to_string(),
            location: "hk".to_string(),
            max_capacity: Some(capacity),
            active: true,
        },
    )?;
    service.set_supply_verified(&supply_id, true)?;
    Ok(supply_id)
}

fn seed_mentee(service: &DemoService, id: &str) -> Result<DemandId, MatchingError> {
    let demand_id = DemandId(id.to_string());
    service.save_demand_profile(
        demand_id.clone(),
        DemandProfileDraft {
            category: "Tax Law".to_string(),
            level: "JD".to_string(),
            interests: "finance audits".to_string(),
            goals: "Qualify in Hong Kong".to_string(),
            language: "English".to_string(),
            location: "HK".to_string(),
        },
    )?;
    Ok(demand_id)
}
